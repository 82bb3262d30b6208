//! Child-status events and the notices they produce.
//!
//! The OS-facing signal relay never mutates the job table directly; it
//! converts each reaped `WaitStatus` into a [`StatusEvent`] and enqueues it.
//! Applying an event may yield a [`Notice`], the one-line state-change
//! report the shell prints.

use std::fmt;

use nix::sys::signal::Signal;
use nix::unistd::Pid;

use crate::jobs::JobId;

/// A state change observed for one child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// The child exited normally with the given code.
    Exited { pid: Pid, code: i32 },
    /// The child was killed by a signal.
    Signaled { pid: Pid, signal: Signal },
    /// The child was stopped by a signal.
    Stopped { pid: Pid, signal: Signal },
    /// The child resumed after a stop.
    Continued { pid: Pid },
}

impl StatusEvent {
    /// Pid the event refers to.
    pub fn pid(&self) -> Pid {
        match *self {
            StatusEvent::Exited { pid, .. }
            | StatusEvent::Signaled { pid, .. }
            | StatusEvent::Stopped { pid, .. }
            | StatusEvent::Continued { pid } => pid,
        }
    }
}

/// User-visible report of a job state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// A job was killed by a signal.
    Terminated { job_id: JobId, pid: Pid, signal: Signal },
    /// A job was stopped by a signal.
    Stopped { job_id: JobId, pid: Pid, signal: Signal },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Terminated { job_id, pid, signal } => write!(
                f,
                "Job [{job_id}] ({pid}) terminated by signal {}",
                *signal as i32
            ),
            Notice::Stopped { job_id, pid, signal } => write!(
                f,
                "Job [{job_id}] ({pid}) Stopped by signal {}",
                *signal as i32
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_name_job_pid_and_signal_number() {
        let stopped = Notice::Stopped {
            job_id: JobId(1),
            pid: Pid::from_raw(123),
            signal: Signal::SIGTSTP,
        };
        assert_eq!(stopped.to_string(), "Job [1] (123) Stopped by signal 20");

        let terminated = Notice::Terminated {
            job_id: JobId(2),
            pid: Pid::from_raw(456),
            signal: Signal::SIGINT,
        };
        assert_eq!(terminated.to_string(), "Job [2] (456) terminated by signal 2");
    }
}
