//! CLI module for restore-verify
//!
//! Provides command-line interface for:
//! - run: Full restore verification
//! - preflight: Non-destructive checks and dump selection

mod args;
mod commands;
mod config;
mod errors;

pub use args::{Cli, Command};
pub use commands::{preflight, run_command};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult, EXIT_USAGE};

/// Parse arguments and execute; returns the process exit status
pub fn run() -> CliResult<i32> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}
