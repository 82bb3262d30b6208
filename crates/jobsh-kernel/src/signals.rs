//! The signal relay: the OS-facing half of job control.
//!
//! [`SignalRelay`] owns the unix signal streams and runs a select loop:
//!
//! - SIGCHLD drains every currently-reapable child with a non-blocking
//!   `waitpid` and enqueues a [`StatusEvent`] per status change
//! - SIGINT and SIGTSTP are forwarded to the foreground job's process group
//! - SIGQUIT terminates the shell cleanly (driver kill switch)
//!
//! The relay never touches the job table. [`Reaper`] is the single consumer
//! of the event channel; it applies events through
//! [`JobControl::apply`](crate::control::JobControl::apply) and prints the
//! resulting notices.

use std::sync::Arc;

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tokio::signal::unix::{signal, Signal as SignalStream, SignalKind};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::control::JobControl;
use crate::events::StatusEvent;

/// Asynchronous handlers for child-status and terminal signals.
pub struct SignalRelay {
    jobs: Arc<JobControl>,
    events: UnboundedSender<StatusEvent>,
    sigchld: SignalStream,
    sigint: SignalStream,
    sigtstp: SignalStream,
    sigquit: SignalStream,
}

impl SignalRelay {
    /// Install the signal streams. Failure here is fatal at startup: a shell
    /// without its handlers cannot control jobs.
    pub fn install(
        jobs: Arc<JobControl>,
        events: UnboundedSender<StatusEvent>,
    ) -> Result<Self> {
        let sigchld =
            signal(SignalKind::child()).context("failed to install SIGCHLD handler")?;
        let sigint =
            signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;
        let sigtstp = signal(SignalKind::from_raw(nix::libc::SIGTSTP))
            .context("failed to install SIGTSTP handler")?;
        let sigquit =
            signal(SignalKind::quit()).context("failed to install SIGQUIT handler")?;
        Ok(Self {
            jobs,
            events,
            sigchld,
            sigint,
            sigtstp,
            sigquit,
        })
    }

    /// Run the relay until the process exits.
    pub async fn run(self) {
        let SignalRelay {
            jobs,
            events,
            mut sigchld,
            mut sigint,
            mut sigtstp,
            mut sigquit,
        } = self;
        loop {
            tokio::select! {
                _ = sigchld.recv() => drain_children(&events),
                _ = sigint.recv() => forward_to_foreground(&jobs, Signal::SIGINT).await,
                _ = sigtstp.recv() => forward_to_foreground(&jobs, Signal::SIGTSTP).await,
                _ = sigquit.recv() => {
                    println!("Terminating after receipt of SIGQUIT signal");
                    std::process::exit(1);
                }
            }
        }
    }
}

/// Reap every child with a pending status change, without blocking on the
/// ones that have not changed state, and enqueue an event per change.
fn drain_children(events: &UnboundedSender<StatusEvent>) {
    let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
    let any_child = Pid::from_raw(-1);
    loop {
        let event = match waitpid(any_child, Some(flags)) {
            Ok(WaitStatus::Exited(pid, code)) => StatusEvent::Exited { pid, code },
            Ok(WaitStatus::Signaled(pid, sig, _)) => StatusEvent::Signaled { pid, signal: sig },
            Ok(WaitStatus::Stopped(pid, sig)) => StatusEvent::Stopped { pid, signal: sig },
            Ok(WaitStatus::Continued(pid)) => StatusEvent::Continued { pid },
            Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break,
            Ok(_) => continue,
            Err(errno) => {
                tracing::warn!(%errno, "waitpid failed");
                break;
            }
        };
        tracing::debug!(?event, "reaped child status");
        if events.send(event).is_err() {
            break;
        }
    }
}

/// Forward a keyboard signal to the foreground job's entire process group.
/// No-op when no job is foreground.
async fn forward_to_foreground(jobs: &JobControl, sig: Signal) {
    if let Some(pid) = jobs.foreground_pid().await {
        if let Err(errno) = killpg(pid, sig) {
            tracing::warn!(%pid, ?sig, %errno, "failed to forward signal");
        }
    }
}

/// Resume a job's process group with SIGCONT.
pub fn continue_group(pid: Pid) -> nix::Result<()> {
    killpg(pid, Signal::SIGCONT)
}

/// Interrupt a job's process group with SIGINT.
pub fn interrupt_group(pid: Pid) -> nix::Result<()> {
    killpg(pid, Signal::SIGINT)
}

/// Single consumer of the status-event channel.
///
/// All asynchronous job-table mutation funnels through this task, which
/// keeps the relay free of shared-state hazards.
pub struct Reaper {
    jobs: Arc<JobControl>,
    events: UnboundedReceiver<StatusEvent>,
}

impl Reaper {
    /// Create a reaper draining `events` into `jobs`.
    pub fn new(jobs: Arc<JobControl>, events: UnboundedReceiver<StatusEvent>) -> Self {
        Self { jobs, events }
    }

    /// Apply events until every sender is dropped.
    pub async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            if let Some(notice) = self.jobs.apply(event).await {
                println!("{notice}");
            }
        }
    }
}
