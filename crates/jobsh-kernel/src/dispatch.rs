//! Command dispatch: builtins and external command launch.
//!
//! `Shell::eval` interprets one parsed line. Builtins (`exit`, `quit`,
//! `jobs`, `fg`, `bg`, `killall`) run synchronously; anything else is
//! spawned as a child process leading its own process group, registered in
//! the job table, and either waited on (foreground) or announced
//! (background).

use std::os::unix::process::CommandExt;
use std::process::Command;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use nix::unistd::Pid;
use thiserror::Error;

use crate::control::RegisterOutcome;
use crate::jobs::{JobId, JobState, JobTableError};
use crate::parse::parse_line;
use crate::shell::{EvalFlow, Shell};
use crate::signals;

/// Parsed fg/bg target: a `%N` job-id reference or a bare pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobRef {
    /// `%N` — addresses a job by its job id.
    JobId(u32),
    /// Bare digits — addresses a job by pid.
    Pid(i32),
}

/// The argument was neither a `%N` reference nor a pid.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("argument must be a PID or %jobid")]
pub struct JobRefError;

impl FromStr for JobRef {
    type Err = JobRefError;

    fn from_str(s: &str) -> Result<Self, JobRefError> {
        if let Some(digits) = s.strip_prefix('%') {
            digits.parse().map(JobRef::JobId).map_err(|_| JobRefError)
        } else if s.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            s.parse().map(JobRef::Pid).map_err(|_| JobRefError)
        } else {
            Err(JobRefError)
        }
    }
}

impl Shell {
    /// Evaluate one command line.
    #[tracing::instrument(level = "debug", skip(self, line))]
    pub async fn eval(&self, line: &str) -> Result<EvalFlow> {
        let parsed = parse_line(line);
        let Some(name) = parsed.argv.first() else {
            // Blank line, or a singleton `&`.
            return Ok(EvalFlow::Continue);
        };
        match name.as_str() {
            "exit" | "quit" => Ok(EvalFlow::Exit(0)),
            "jobs" => {
                self.builtin_jobs().await;
                Ok(EvalFlow::Continue)
            }
            "fg" | "bg" => {
                self.builtin_fg_bg(name, &parsed.argv[1..]).await;
                Ok(EvalFlow::Continue)
            }
            "killall" => {
                self.builtin_killall(&parsed.argv[1..]);
                Ok(EvalFlow::Continue)
            }
            _ => {
                self.run_external(&parsed.argv, line.trim(), parsed.background)
                    .await?;
                Ok(EvalFlow::Continue)
            }
        }
    }

    /// List every live job.
    async fn builtin_jobs(&self) {
        for job in self.jobs().jobs().await {
            println!("{job}");
        }
    }

    /// The fg/bg state-transition routine.
    ///
    /// Resolves the single argument to a job, resumes its process group with
    /// SIGCONT, then either takes it foreground (and blocks in the wait
    /// gate) or sets it background with an announcement.
    async fn builtin_fg_bg(&self, which: &str, args: &[String]) {
        let Some(target) = args.first() else {
            println!("{which} This command requires a PID or %jobid as an argument");
            return;
        };
        let job = match target.parse::<JobRef>() {
            Ok(JobRef::JobId(id)) => match self.jobs().find_by_job_id(JobId(id)).await {
                Some(job) => job,
                None => {
                    println!("%{id}: No such job exists");
                    return;
                }
            },
            Ok(JobRef::Pid(raw)) => match self.jobs().find_by_pid(Pid::from_raw(raw)).await {
                Some(job) => job,
                None => {
                    println!("({raw}): No such process");
                    return;
                }
            },
            Err(err) => {
                println!("{which}: {err}");
                return;
            }
        };

        if let Err(errno) = signals::continue_group(job.pid) {
            println!("{which}: failed to resume job ({}): {errno}", job.pid);
            return;
        }
        if which == "fg" {
            self.jobs().set_state(job.pid, JobState::Foreground).await;
            self.jobs().wait_foreground(job.pid).await;
        } else {
            self.jobs().set_state(job.pid, JobState::Background).await;
            println!("[{}] ({}) {}", job.job_id, job.pid, job.command_line);
        }
    }

    /// Schedule a deferred interrupt broadcast to every live job.
    fn builtin_killall(&self, args: &[String]) {
        let Some(delay) = args.first().and_then(|arg| arg.parse::<u64>().ok()) else {
            println!("killall: requires a numeric delay in seconds");
            return;
        };
        let jobs = self.jobs().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(delay)).await;
            for pid in jobs.live_pids().await {
                if let Err(errno) = signals::interrupt_group(pid) {
                    tracing::warn!(%pid, %errno, "killall broadcast failed");
                }
            }
        });
    }

    /// Spawn an external command and register it as a job.
    async fn run_external(&self, argv: &[String], line: &str, background: bool) -> Result<()> {
        let mut command = Command::new(&argv[0]);
        command.args(&argv[1..]);
        // The child leads its own process group so killpg targets the job
        // and its descendants, never the shell.
        command.process_group(0);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                println!("{}: Command not found", argv[0]);
                return Ok(());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to spawn {}", argv[0]))
            }
        };
        let pid = Pid::from_raw(child.id() as i32);
        // The relay reaps this child; the handle must not wait on it.
        drop(child);

        let state = if background {
            JobState::Background
        } else {
            JobState::Foreground
        };
        match self.jobs().register(pid, state, line).await {
            Ok(RegisterOutcome::Added { job_id, notice }) => {
                if self.config().verbose {
                    println!("Added job [{job_id}] {pid} {line}");
                }
                let stopped_early = notice.is_some();
                if let Some(notice) = notice {
                    println!("{notice}");
                }
                if background {
                    println!("[{job_id}] ({pid}) {line}");
                } else if !stopped_early {
                    self.jobs().wait_foreground(pid).await;
                }
            }
            Ok(RegisterOutcome::Reaped { notice }) => {
                if let Some(notice) = notice {
                    println!("{notice}");
                }
            }
            Err(err @ JobTableError::Full { .. }) => {
                // The child already runs; signal routing for it is limited.
                println!("{err}; job ({pid}) launched but will not be tracked");
            }
            Err(err) => println!("{err}"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("%1", Ok(JobRef::JobId(1)))]
    #[case("%42", Ok(JobRef::JobId(42)))]
    #[case("1234", Ok(JobRef::Pid(1234)))]
    #[case("%", Err(JobRefError))]
    #[case("%x", Err(JobRefError))]
    #[case("abc", Err(JobRefError))]
    #[case("12ab", Err(JobRefError))]
    fn job_ref_parsing(#[case] input: &str, #[case] expected: Result<JobRef, JobRefError>) {
        assert_eq!(input.parse::<JobRef>(), expected);
    }
}
