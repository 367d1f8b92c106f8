//! CLI command implementations
//!
//! Both commands load the configuration, identify the local host and build
//! a verifier against the PostgreSQL client binaries. The result is printed
//! to stdout as one JSON object; console events go to stderr, so stdout
//! carries nothing else. The exit status carries the verdict.

use std::path::Path;

use serde_json::{json, Value};

use crate::context::{resolve_hostname, RunContext};
use crate::dump::DumpArtifact;
use crate::engine::PostgresEngine;
use crate::notify::EmailNotifier;
use crate::pipeline::{RestoreVerifier, RunOutcome, EXIT_FAILED, EXIT_OK};
use crate::preflight::PreconditionResult;

use super::args::Command;
use super::config::Config;
use super::errors::{CliError, CliResult};

/// Dispatch a parsed command; returns the process exit status
pub fn run_command(command: Command) -> CliResult<i32> {
    match command {
        Command::Run { config } => run(&config),
        Command::Preflight { config } => preflight(&config),
    }
}

/// Full verification run
pub fn run(config_path: &Path) -> CliResult<i32> {
    let (config, ctx) = load(config_path)?;

    let engine = PostgresEngine::new(ctx.engine.clone());
    let notifier = EmailNotifier::new(config.email_config()?);
    let verifier = RestoreVerifier::new(&ctx, engine, notifier);

    let outcome = verifier.run();
    print_json(&outcome_json(&outcome, &verifier.reporter().run_id().to_string()))?;

    Ok(outcome.exit_code())
}

/// Non-destructive checks only; never restores, drops or notifies
pub fn preflight(config_path: &Path) -> CliResult<i32> {
    let (config, ctx) = load(config_path)?;

    let engine = PostgresEngine::new(ctx.engine.clone());
    let notifier = EmailNotifier::new(config.email_config()?);
    let verifier = RestoreVerifier::new(&ctx, engine, notifier);

    let result = verifier.check();
    print_json(&preflight_json(&result))?;

    Ok(if result.is_ok() { EXIT_OK } else { EXIT_FAILED })
}

fn load(config_path: &Path) -> CliResult<(Config, RunContext)> {
    let config = Config::load(config_path)?;
    let host = resolve_hostname()
        .map_err(|e| CliError::host_unresolved(format!("Failed to resolve hostname: {}", e)))?;
    let ctx = config.to_context(host)?;
    Ok((config, ctx))
}

fn outcome_json(outcome: &RunOutcome, run_id: &str) -> Value {
    let mut value = json!({
        "run_id": run_id,
        "outcome": outcome.label(),
        "code": outcome.code(),
        "severity": outcome.severity().as_str(),
        "summary": outcome.summary(),
        "exit_code": outcome.exit_code(),
    });

    if let Some(dump) = outcome.dump() {
        value["dump"] = json!(dump.path().display().to_string());
    }
    if let Some(stats) = outcome.stats() {
        value["dump_size"] = json!(stats.dump_size_display());
        value["duration"] = json!(stats.duration_display());
        value["cluster_size"] = json!(stats.cluster_size_display());
    }
    if let RunOutcome::RestoredWithWarnings { warnings, .. } = outcome {
        value["warnings"] = json!(warnings);
    }

    value
}

fn preflight_json(result: &PreconditionResult<DumpArtifact>) -> Value {
    match result {
        Ok(dump) => json!({
            "status": "ready",
            "dump": dump.path().display().to_string(),
            "dump_date": dump.date().map(|d| d.format("%Y-%m-%d").to_string()),
        }),
        Err(e) => json!({
            "status": "blocked",
            "code": e.code(),
            "reason": e.to_string(),
            "details": e.details(),
        }),
    }
}

fn print_json(value: &Value) -> CliResult<()> {
    let text = serde_json::to_string(value)
        .map_err(|e| CliError::io_error(format!("JSON error: {}", e)))?;
    println!("{}", text);
    Ok(())
}
