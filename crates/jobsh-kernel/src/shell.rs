//! The Shell — owns and wires up the job-control components.
//!
//! Construction installs the signal relay and spawns the reaper task; the
//! read loop then feeds lines to [`Shell::eval`] (implemented in
//! [`dispatch`](crate::dispatch)).

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::control::JobControl;
use crate::events::StatusEvent;
use crate::jobs::DEFAULT_CAPACITY;
use crate::signals::{Reaper, SignalRelay};

/// Configuration for shell initialization.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Job table capacity.
    pub capacity: usize,
    /// Announce job registration on stdout.
    pub verbose: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            verbose: false,
        }
    }
}

impl ShellConfig {
    /// Set the job table capacity.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Enable registration announcements.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// What the read loop should do after evaluating a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalFlow {
    /// Keep reading.
    Continue,
    /// Terminate the shell with the given exit code.
    Exit(i32),
}

/// The shell: job-control context plus the command dispatcher.
pub struct Shell {
    jobs: Arc<JobControl>,
    config: ShellConfig,
}

impl Shell {
    /// Create a shell with live signal handling.
    ///
    /// Installs the four signal streams and spawns the relay and reaper
    /// tasks. Must be called inside a tokio runtime; signal-install failure
    /// is fatal to the caller.
    pub fn new(config: ShellConfig) -> Result<Self> {
        let jobs = Arc::new(JobControl::new(config.capacity));
        let (tx, rx) = mpsc::unbounded_channel();
        let relay = SignalRelay::install(jobs.clone(), tx)?;
        tokio::spawn(relay.run());
        tokio::spawn(Reaper::new(jobs.clone(), rx).run());
        Ok(Self { jobs, config })
    }

    /// Create a shell wired to a caller-owned event channel instead of OS
    /// signal streams. No interrupt/stop forwarding happens; callers (tests)
    /// inject [`StatusEvent`]s directly.
    pub fn isolated(config: ShellConfig) -> (Self, UnboundedSender<StatusEvent>) {
        let jobs = Arc::new(JobControl::new(config.capacity));
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(Reaper::new(jobs.clone(), rx).run());
        (Self { jobs, config }, tx)
    }

    /// The shared job-control context.
    pub fn jobs(&self) -> &Arc<JobControl> {
        &self.jobs
    }

    /// The configuration this shell was built with.
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }
}
