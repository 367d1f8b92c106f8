//! CLI Command Tests
//!
//! The commands are driven end to end from a configuration file. Every
//! scenario here stops at a precondition, so no engine binary is ever
//! invoked.

use std::fs;
use std::path::Path;

use restore_verify::cli::{run_command, Command, EXIT_USAGE};
use restore_verify::runlog::daily_files;
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn write_config(root: &Path, expected_host: &str) -> std::path::PathBuf {
    for dir in ["data", "pg_log", "backups/20240315_test_db", "logs"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }

    let config = json!({
        "expected_host": expected_host,
        "backup_dir": root.join("backups"),
        "dump_suffix": "test_db",
        "database": "test_db",
        "engine": {
            "bin_dir": root.join("no-such-bin"),
            "data_dir": root.join("data"),
            "log_dir": root.join("pg_log")
        },
        "run_log": { "dir": root.join("logs"), "retain": 3 },
        "notify": { "enabled": false }
    });

    let path = root.join("restore-verify.json");
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path
}

// =============================================================================
// Commands
// =============================================================================

/// A run on the wrong host exits 1 and leaves a run log behind.
#[test]
fn test_run_on_wrong_host_exits_one() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "designated-recovery-host.invalid");

    let code = run_command(Command::Run { config }).unwrap();
    assert_eq!(code, 1);

    let files = daily_files(&temp.path().join("logs"), "restore_verify").unwrap();
    assert_eq!(files.len(), 1);
    let text = fs::read_to_string(&files[0]).unwrap();
    assert!(text.contains("WARNING: run aborted: host mismatch"));
    assert!(text.contains("INFO: notification suppressed"));
}

#[test]
fn test_preflight_on_wrong_host_exits_one() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "designated-recovery-host.invalid");

    assert_eq!(run_command(Command::Preflight { config }).unwrap(), 1);

    let files = daily_files(&temp.path().join("logs"), "restore_verify").unwrap();
    assert_eq!(files.len(), 1, "VIOLATION: a blocked preflight must leave a run log");
    let text = fs::read_to_string(&files[0]).unwrap();
    assert!(text.contains("WARNING: preflight blocked: host mismatch"));
    assert!(!text.contains("notification"));
}

/// stdout carries only the result object; console events go to stderr.
#[test]
fn test_binary_stdout_is_one_json_object() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), "designated-recovery-host.invalid");

    let output = std::process::Command::new(env!("CARGO_BIN_EXE_restore-verify"))
        .arg("run")
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 1, "stdout: {}", stdout);
    let result: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(result["outcome"], "ABORTED");
    assert_eq!(result["code"], "RV_PRECONDITION_HOST");

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("\"event\":\"HOST_MISMATCH\""), "stderr: {}", stderr);
    assert!(stderr.contains("\"event\":\"RUN_BEGIN\""));
}

#[test]
fn test_missing_config_is_usage_error() {
    let temp = TempDir::new().unwrap();
    let err = run_command(Command::Run {
        config: temp.path().join("absent.json"),
    })
    .unwrap_err();

    assert_eq!(err.code_str(), "RV_CLI_CONFIG_ERROR");
    assert_eq!(err.exit_code(), EXIT_USAGE);
}

#[test]
fn test_invalid_config_is_usage_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("restore-verify.json");
    fs::write(
        &path,
        json!({
            "expected_host": "recovery01",
            "backup_dir": "/backups",
            "dump_suffix": "test_db",
            "database": "test_db",
            "restore_jobs": 0,
            "engine": { "data_dir": "/data", "log_dir": "/log" },
            "run_log": { "dir": "/logs" }
        })
        .to_string(),
    )
    .unwrap();

    let err = run_command(Command::Preflight { config: path }).unwrap_err();
    assert_eq!(err.message(), "restore_jobs must be >= 1");
}
