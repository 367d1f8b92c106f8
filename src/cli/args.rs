//! CLI argument definitions using clap
//!
//! Commands:
//! - restore-verify run --config <path>
//! - restore-verify preflight --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// restore-verify - prove that the latest dump restores on the recovery host
#[derive(Parser, Debug)]
#[command(name = "restore-verify")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Restore the latest dump, audit it, measure it and drop it
    Run {
        /// Path to configuration file
        #[arg(long, default_value = "./restore-verify.json")]
        config: PathBuf,
    },

    /// Run the non-destructive checks and report the dump that would be restored
    Preflight {
        /// Path to configuration file
        #[arg(long, default_value = "./restore-verify.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
