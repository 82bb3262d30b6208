//! jobsh CLI entry point.
//!
//! Usage:
//!   jobsh          # Interactive shell
//!   jobsh -v       # Verbose job-registration diagnostics
//!   jobsh -p       # No prompt (for scripted drivers)

use std::process::ExitCode;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jobsh_repl::ReplOptions;

fn main() -> ExitCode {
    let mut options = ReplOptions::default();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "-h" => return usage(),
            "-v" => options.verbose = true,
            "-p" => options.emit_prompt = false,
            _ => return usage(),
        }
    }

    // Respects RUST_LOG; -v raises the kernel crate to debug.
    let filter = if options.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("jobsh_kernel=debug"))
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match jobsh_repl::run(options) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("jobsh: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn usage() -> ExitCode {
    println!("Usage: jobsh [-hvp]");
    println!("   -h   print this message");
    println!("   -v   print additional diagnostic information");
    println!("   -p   do not emit a command prompt");
    ExitCode::FAILURE
}
