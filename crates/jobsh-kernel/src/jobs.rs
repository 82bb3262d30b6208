//! The job table: a fixed-capacity registry of tracked child processes.
//!
//! Each live job records its pid, a small user-facing job id (the `%N`
//! syntax), its run state, and the command line that produced it. The table
//! is a plain synchronous structure; all shared access goes through
//! [`JobControl`](crate::control::JobControl).

use std::fmt;

use nix::unistd::Pid;
use thiserror::Error;

/// Default number of job slots.
pub const DEFAULT_CAPACITY: usize = 16;

/// User-facing job identifier, unique among currently live jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(pub u32);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Run state of a job.
///
/// At most one job is `Foreground` at any instant; a new foreground job is
/// only created after the previous one has left that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Running in the foreground; the shell is blocked in the wait gate.
    Foreground,
    /// Running in the background.
    Background,
    /// Stopped by a signal; still live until resumed or terminated.
    Stopped,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Foreground => write!(f, "Foreground"),
            JobState::Background => write!(f, "Running"),
            JobState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// One tracked child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Process id; also the process-group id, since every job leads its own
    /// group.
    pub pid: Pid,
    /// User-facing job id.
    pub job_id: JobId,
    /// Current run state.
    pub state: JobState,
    /// The command line that produced the job, retained for display.
    pub command_line: String,
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] ({}) {} {}",
            self.job_id, self.pid, self.state, self.command_line
        )
    }
}

/// Errors from job registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobTableError {
    /// No free slot. The caller decides whether the child still runs
    /// untracked; the table itself never drops a job silently.
    #[error("job table full ({capacity} slots)")]
    Full { capacity: usize },

    /// Pids below 1 are never valid jobs.
    #[error("invalid pid {0}")]
    InvalidPid(i32),
}

/// Fixed-capacity, slot-ordered collection of jobs.
///
/// Job ids auto-increment and wrap back to 1 once the counter passes the
/// capacity; removal recomputes the counter from the largest live id, so ids
/// are reused only after the counter wraps past freed ids.
#[derive(Debug)]
pub struct JobTable {
    slots: Vec<Option<Job>>,
    next_job_id: u32,
}

impl JobTable {
    /// Create an empty table with `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            next_job_id: 1,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Reset every slot and the id counter.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.next_job_id = 1;
    }

    /// Largest job id among live jobs, or 0 if none are live.
    pub fn max_job_id(&self) -> u32 {
        self.iter_live().map(|job| job.job_id.0).max().unwrap_or(0)
    }

    /// Register a job in the first free slot and assign it the next id.
    pub fn add(
        &mut self,
        pid: Pid,
        state: JobState,
        command_line: &str,
    ) -> Result<JobId, JobTableError> {
        if pid.as_raw() < 1 {
            return Err(JobTableError::InvalidPid(pid.as_raw()));
        }
        let capacity = self.capacity();
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.is_none())
            .ok_or(JobTableError::Full { capacity })?;

        let job_id = JobId(self.next_job_id);
        self.next_job_id += 1;
        if self.next_job_id as usize > capacity {
            self.next_job_id = 1;
        }

        *slot = Some(Job {
            pid,
            job_id,
            state,
            command_line: command_line.to_string(),
        });
        Ok(job_id)
    }

    /// Remove the job with the given pid. Returns false if no job matches;
    /// the table is left unchanged in that case.
    pub fn remove(&mut self, pid: Pid) -> bool {
        if pid.as_raw() < 1 {
            return false;
        }
        let Some(slot) = self
            .slots
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|job| job.pid == pid))
        else {
            return false;
        };
        *slot = None;
        self.next_job_id = self.max_job_id() + 1;
        true
    }

    /// Find a live job by pid. Pids below 1 are "not found", not an error.
    pub fn find_by_pid(&self, pid: Pid) -> Option<&Job> {
        if pid.as_raw() < 1 {
            return None;
        }
        self.iter_live().find(|job| job.pid == pid)
    }

    /// Find a live job by job id. Ids below 1 are "not found".
    pub fn find_by_job_id(&self, job_id: JobId) -> Option<&Job> {
        if job_id.0 < 1 {
            return None;
        }
        self.iter_live().find(|job| job.job_id == job_id)
    }

    /// Update the state of the job with the given pid.
    pub fn set_state(&mut self, pid: Pid, state: JobState) -> bool {
        let Some(job) = self
            .slots
            .iter_mut()
            .flatten()
            .find(|job| job.pid == pid)
        else {
            return false;
        };
        job.state = state;
        true
    }

    /// Pid of the unique foreground job, if any.
    pub fn foreground_pid(&self) -> Option<Pid> {
        self.iter_live()
            .find(|job| job.state == JobState::Foreground)
            .map(|job| job.pid)
    }

    /// Live jobs in slot order.
    pub fn iter_live(&self) -> impl Iterator<Item = &Job> {
        self.slots.iter().flatten()
    }

    /// True when no job is live.
    pub fn is_empty(&self) -> bool {
        self.iter_live().next().is_none()
    }
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: i32) -> Pid {
        Pid::from_raw(n)
    }

    #[test]
    fn add_assigns_sequential_ids() {
        let mut table = JobTable::default();
        assert_eq!(table.add(pid(100), JobState::Background, "a").unwrap(), JobId(1));
        assert_eq!(table.add(pid(101), JobState::Background, "b").unwrap(), JobId(2));
        assert_eq!(table.max_job_id(), 2);
    }

    #[test]
    fn add_rejects_invalid_pid() {
        let mut table = JobTable::default();
        assert_eq!(
            table.add(pid(0), JobState::Background, "x"),
            Err(JobTableError::InvalidPid(0))
        );
        assert!(table.is_empty());
    }

    #[test]
    fn add_fails_when_full() {
        let mut table = JobTable::new(2);
        table.add(pid(1), JobState::Background, "a").unwrap();
        table.add(pid(2), JobState::Background, "b").unwrap();
        assert_eq!(
            table.add(pid(3), JobState::Background, "c"),
            Err(JobTableError::Full { capacity: 2 })
        );
    }

    #[test]
    fn add_then_find_returns_the_same_fields() {
        let mut table = JobTable::default();
        let job_id = table.add(pid(42), JobState::Foreground, "cat file").unwrap();
        let job = table.find_by_pid(pid(42)).unwrap();
        assert_eq!(job.pid, pid(42));
        assert_eq!(job.job_id, job_id);
        assert_eq!(job.state, JobState::Foreground);
        assert_eq!(job.command_line, "cat file");
    }

    #[test]
    fn remove_of_absent_pid_leaves_table_unchanged() {
        let mut table = JobTable::default();
        table.add(pid(100), JobState::Background, "a").unwrap();
        assert!(!table.remove(pid(999)));
        assert!(!table.remove(pid(-1)));
        assert_eq!(table.iter_live().count(), 1);
    }

    #[test]
    fn remove_recomputes_next_id_from_max_live_id() {
        let mut table = JobTable::default();
        table.add(pid(200), JobState::Background, "a").unwrap(); // job 1
        table.add(pid(201), JobState::Background, "b").unwrap(); // job 2
        assert!(table.remove(pid(200)));
        // Counter restarts above the largest remaining id (2), so the next
        // job gets 3; id 1 is reused only after the counter wraps.
        assert_eq!(table.add(pid(202), JobState::Background, "c").unwrap(), JobId(3));
    }

    #[test]
    fn ids_and_pids_stay_unique_across_churn() {
        let mut table = JobTable::default();
        for round in 0..3 {
            for n in 1..=8 {
                table.add(pid(round * 100 + n), JobState::Background, "x").unwrap();
            }
            let live: Vec<_> = table.iter_live().cloned().collect();
            let mut pids: Vec<_> = live.iter().map(|j| j.pid).collect();
            let mut ids: Vec<_> = live.iter().map(|j| j.job_id).collect();
            pids.sort_by_key(|p| p.as_raw());
            pids.dedup();
            ids.sort_by_key(|id| id.0);
            ids.dedup();
            assert_eq!(pids.len(), live.len());
            assert_eq!(ids.len(), live.len());
            for n in 1..=8 {
                table.remove(pid(round * 100 + n));
            }
        }
        assert!(table.is_empty());
    }

    #[test]
    fn foreground_pid_reports_the_single_foreground_job() {
        let mut table = JobTable::default();
        assert_eq!(table.foreground_pid(), None);
        table.add(pid(10), JobState::Background, "bg").unwrap();
        table.add(pid(11), JobState::Foreground, "fg").unwrap();
        assert_eq!(table.foreground_pid(), Some(pid(11)));
        table.set_state(pid(11), JobState::Stopped);
        assert_eq!(table.foreground_pid(), None);
    }

    #[test]
    fn listing_enumerates_exactly_the_live_jobs() {
        let mut table = JobTable::default();
        for n in 1..=5 {
            table.add(pid(n), JobState::Background, "job").unwrap();
        }
        table.remove(pid(2));
        table.remove(pid(4));
        let listed: Vec<_> = table.iter_live().map(|j| j.pid.as_raw()).collect();
        assert_eq!(listed, vec![1, 3, 5]);
        // Restartable: a second pass sees the same sequence.
        let again: Vec<_> = table.iter_live().map(|j| j.pid.as_raw()).collect();
        assert_eq!(again, listed);
    }
}
