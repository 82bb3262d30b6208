//! jobsh read loop: prompt emission and line evaluation.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use jobsh_kernel::{EvalFlow, Shell, ShellConfig};

/// The command-line prompt.
pub const PROMPT: &str = "jobsh> ";

/// Options gathered from the command-line flags.
#[derive(Debug, Clone, Copy)]
pub struct ReplOptions {
    /// `-v`: announce job registration.
    pub verbose: bool,
    /// Cleared by `-p`: emit no prompt and read plain stdin (driver mode).
    pub emit_prompt: bool,
}

impl Default for ReplOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            emit_prompt: true,
        }
    }
}

/// Run the shell until exit, returning its exit code.
pub fn run(options: ReplOptions) -> Result<i32> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    runtime.block_on(run_loop(options))
}

async fn run_loop(options: ReplOptions) -> Result<i32> {
    let config = ShellConfig::default().with_verbose(options.verbose);
    let shell = Shell::new(config).context("failed to install signal handlers")?;
    if options.emit_prompt {
        interactive(shell).await
    } else {
        driver(shell).await
    }
}

/// Prompted loop over rustyline.
///
/// `readline` blocks one worker thread; the signal relay and reaper keep
/// running on the others.
async fn interactive(shell: Shell) -> Result<i32> {
    let mut editor = DefaultEditor::new().context("failed to open terminal")?;
    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                match shell.eval(&line).await {
                    Ok(EvalFlow::Continue) => {}
                    Ok(EvalFlow::Exit(code)) => return Ok(code),
                    Err(err) => println!("jobsh: {err:#}"),
                }
            }
            // ^C at an empty prompt just redraws; a running foreground job
            // receives the signal through the relay instead.
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => return Ok(0),
            Err(err) => return Err(err).context("failed to read command line"),
        }
    }
}

/// Promptless loop over plain stdin, for scripted drivers.
async fn driver(shell: Shell) -> Result<i32> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read stdin")?;
        match shell.eval(&line).await {
            Ok(EvalFlow::Continue) => {}
            Ok(EvalFlow::Exit(code)) => return Ok(code),
            Err(err) => println!("jobsh: {err:#}"),
        }
        io::stdout().flush().ok();
    }
    Ok(0)
}
