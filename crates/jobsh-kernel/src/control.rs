//! The shared job-control context.
//!
//! `JobControl` owns the job table behind a lock and pairs it with a watch
//! channel whose value bumps on every mutation. The dispatcher registers new
//! jobs through it, the reaper applies status events through it, and the
//! foreground wait gate blocks on the watch channel instead of polling.
//!
//! # The registration race
//!
//! A child can exit before the parent finishes registering it. Events for an
//! unknown pid are stashed in a pending map rather than dropped;
//! [`JobControl::register`] consults that map first, so a child that already
//! exited is reported as [`RegisterOutcome::Reaped`] and never occupies a
//! slot, and a child that stopped before registration enters the table
//! already `Stopped`.
//!
//! The stash is scoped to pids awaiting registration. When registration
//! fails on a full table the pid is recorded as untracked instead, and its
//! later events are discarded; a stale stashed event could otherwise shadow
//! a future job that reuses the pid.

use std::collections::{HashMap, HashSet};

use nix::unistd::Pid;
use tokio::sync::{watch, RwLock};

use crate::events::{Notice, StatusEvent};
use crate::jobs::{Job, JobId, JobState, JobTable, JobTableError};

struct ControlState {
    table: JobTable,
    /// Events whose pid was not yet registered, keyed by raw pid. Only pids
    /// in the spawn-to-register window live here; registration always
    /// consumes its entry, so the map stays bounded.
    pending: HashMap<i32, StatusEvent>,
    /// Pids whose registration failed (table full). The children run
    /// untracked; their status events are discarded rather than stashed, so
    /// a stale entry can never swallow a later job that reuses the pid.
    untracked: HashSet<i32>,
}

/// Result of registering a freshly spawned job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The job is now tracked. `notice` is set when a stop event arrived
    /// before registration and the job entered the table already stopped.
    Added {
        job_id: JobId,
        notice: Option<Notice>,
    },
    /// The child terminated before registration completed; it never occupied
    /// a slot. `notice` is set when the termination was signal-driven.
    Reaped { notice: Option<Notice> },
}

/// Process-wide job-control state shared by the dispatcher and the reaper.
pub struct JobControl {
    state: RwLock<ControlState>,
    /// Bumped after every table mutation; the wait gate subscribes to it.
    generation: watch::Sender<u64>,
}

impl JobControl {
    /// Create a context with a `capacity`-slot job table.
    pub fn new(capacity: usize) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            state: RwLock::new(ControlState {
                table: JobTable::new(capacity),
                pending: HashMap::new(),
                untracked: HashSet::new(),
            }),
            generation,
        }
    }

    fn bump(&self) {
        self.generation.send_modify(|gen| *gen += 1);
    }

    /// Register a job immediately after a successful spawn.
    ///
    /// Must be called before any other work in the parent so the reaper can
    /// address the pid. A status event that raced ahead of registration is
    /// resolved here; see the module docs.
    ///
    /// On `Err(Full)` the pid is marked untracked: the caller keeps the child
    /// running, and later status events for it are discarded.
    pub async fn register(
        &self,
        pid: Pid,
        state: JobState,
        command_line: &str,
    ) -> Result<RegisterOutcome, JobTableError> {
        let mut guard = self.state.write().await;
        let early = guard.pending.remove(&pid.as_raw());
        let outcome = match early {
            Some(StatusEvent::Exited { code, .. }) => {
                tracing::debug!(%pid, code, "job exited before registration");
                Ok(RegisterOutcome::Reaped { notice: None })
            }
            Some(StatusEvent::Signaled { signal, .. }) => {
                // Assign an id so the notice reads like any other kill, then
                // release the slot straight away. With a full table the child
                // is still gone; it just gets no notice line.
                let notice = match guard.table.add(pid, state, command_line) {
                    Ok(job_id) => {
                        guard.table.remove(pid);
                        Some(Notice::Terminated { job_id, pid, signal })
                    }
                    Err(_) => None,
                };
                Ok(RegisterOutcome::Reaped { notice })
            }
            Some(StatusEvent::Stopped { signal, .. }) => guard
                .table
                .add(pid, JobState::Stopped, command_line)
                .map(|job_id| RegisterOutcome::Added {
                    job_id,
                    notice: Some(Notice::Stopped { job_id, pid, signal }),
                }),
            Some(StatusEvent::Continued { .. }) | None => {
                guard.table.add(pid, state, command_line).map(|job_id| {
                    tracing::debug!(%pid, %job_id, ?state, command_line, "registered job");
                    RegisterOutcome::Added { job_id, notice: None }
                })
            }
        };
        if outcome.is_err() {
            guard.untracked.insert(pid.as_raw());
        }
        drop(guard);
        self.bump();
        outcome
    }

    /// Apply one status event to the table. This is the single mutation
    /// point for asynchronous state changes; only the reaper calls it in
    /// production.
    ///
    /// Events for a pid not in the table are stashed, not faulted on.
    pub async fn apply(&self, event: StatusEvent) -> Option<Notice> {
        let mut guard = self.state.write().await;
        let notice = match event {
            StatusEvent::Exited { pid, code } => {
                if guard.table.remove(pid) {
                    tracing::debug!(%pid, code, "job exited");
                } else if guard.untracked.remove(&pid.as_raw()) {
                    tracing::debug!(%pid, code, "untracked job exited");
                } else {
                    guard.pending.insert(pid.as_raw(), event);
                }
                None
            }
            StatusEvent::Signaled { pid, signal } => {
                match guard.table.find_by_pid(pid).map(|job| job.job_id) {
                    Some(job_id) => {
                        guard.table.remove(pid);
                        Some(Notice::Terminated { job_id, pid, signal })
                    }
                    None => {
                        if guard.untracked.remove(&pid.as_raw()) {
                            tracing::debug!(%pid, ?signal, "untracked job terminated");
                        } else {
                            guard.pending.insert(pid.as_raw(), event);
                        }
                        None
                    }
                }
            }
            StatusEvent::Stopped { pid, signal } => {
                match guard.table.find_by_pid(pid).map(|job| job.job_id) {
                    Some(job_id) => {
                        guard.table.set_state(pid, JobState::Stopped);
                        Some(Notice::Stopped { job_id, pid, signal })
                    }
                    // An untracked child stays in the set until a terminal
                    // event clears it.
                    None if guard.untracked.contains(&pid.as_raw()) => None,
                    None => {
                        guard.pending.insert(pid.as_raw(), event);
                        None
                    }
                }
            }
            StatusEvent::Continued { pid } => {
                let was_stopped = guard
                    .table
                    .find_by_pid(pid)
                    .is_some_and(|job| job.state == JobState::Stopped);
                if was_stopped {
                    guard.table.set_state(pid, JobState::Background);
                }
                None
            }
        };
        drop(guard);
        self.bump();
        notice
    }

    /// Update a job's state, e.g. for the fg/bg builtins.
    pub async fn set_state(&self, pid: Pid, state: JobState) -> bool {
        let changed = {
            let mut guard = self.state.write().await;
            guard.table.set_state(pid, state)
        };
        self.bump();
        changed
    }

    /// Find a live job by pid.
    pub async fn find_by_pid(&self, pid: Pid) -> Option<Job> {
        self.state.read().await.table.find_by_pid(pid).cloned()
    }

    /// Find a live job by job id.
    pub async fn find_by_job_id(&self, job_id: JobId) -> Option<Job> {
        self.state.read().await.table.find_by_job_id(job_id).cloned()
    }

    /// Pid of the unique foreground job, if any.
    pub async fn foreground_pid(&self) -> Option<Pid> {
        self.state.read().await.table.foreground_pid()
    }

    /// Pids of every live job, in slot order.
    pub async fn live_pids(&self) -> Vec<Pid> {
        self.state
            .read()
            .await
            .table
            .iter_live()
            .map(|job| job.pid)
            .collect()
    }

    /// Snapshot of every live job for listing.
    pub async fn jobs(&self) -> Vec<Job> {
        self.state.read().await.table.iter_live().cloned().collect()
    }

    /// True when no job is live.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.table.is_empty()
    }

    /// The foreground wait gate.
    ///
    /// Blocks until the job with `pid` is no longer in the `Foreground`
    /// state, whether it completed, was killed, or was stopped. Returns at
    /// once when the pid is absent or not foreground. The subscribe-check-
    /// wait order guarantees no wakeup is missed: every mutation bumps the
    /// generation after the table write.
    pub async fn wait_foreground(&self, pid: Pid) {
        let mut rx = self.generation.subscribe();
        loop {
            {
                let guard = self.state.read().await;
                match guard.table.find_by_pid(pid) {
                    Some(job) if job.state == JobState::Foreground => {}
                    _ => return,
                }
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}
