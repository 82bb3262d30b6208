//! jobsh-kernel: the job-control core of jobsh.
//!
//! This crate provides:
//!
//! - **Jobs**: the fixed-capacity job table mapping pids to job metadata
//! - **Events**: structured child-status events and user-visible notices
//! - **Control**: the shared job-control context, including the foreground
//!   wait gate
//! - **Signals**: the OS-facing relay that turns SIGCHLD into status events
//!   and forwards keyboard signals to the foreground process group
//! - **Dispatch**: builtin recognition and external command launch
//! - **Parse**: command-line tokenization and the background marker
//!
//! # Architecture
//!
//! ```text
//! read loop ──▶ Shell::eval ──▶ builtins │ spawn + register ──▶ wait gate
//!                                   │                              ▲
//!                                   ▼                              │ watch
//! SIGCHLD ──▶ SignalRelay ──▶ StatusEvent channel ──▶ Reaper ──▶ JobControl
//! SIGINT/SIGTSTP ──▶ killpg(foreground group)
//! ```
//!
//! The relay never touches the job table. It only enqueues [`StatusEvent`]s;
//! the [`Reaper`](signals::Reaper) is the single consumer that mutates the
//! table through [`JobControl::apply`], so main-flow registration and
//! asynchronous reaping never race on table state.

pub mod control;
pub mod dispatch;
pub mod events;
pub mod jobs;
pub mod parse;
pub mod shell;
pub mod signals;

pub use control::{JobControl, RegisterOutcome};
pub use dispatch::{JobRef, JobRefError};
pub use events::{Notice, StatusEvent};
pub use jobs::{Job, JobId, JobState, JobTable, JobTableError, DEFAULT_CAPACITY};
pub use parse::{parse_line, ParsedLine};
pub use shell::{EvalFlow, Shell, ShellConfig};
pub use signals::{Reaper, SignalRelay};
