//! Verification Pipeline Scenario Tests
//!
//! Tests for the guarantees a run gives the operator:
//! - Nothing destructive runs unless every precondition holds
//! - The newest matching dump is the one restored
//! - A failed restore is never cleaned up
//! - Engine log errors are warnings; cleanup still runs
//! - A failed cleanup blocks the next run
//! - Exactly one terminal outcome, notified and logged

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use restore_verify::context::{AuditScope, EngineSettings, RunContext};
use restore_verify::engine::{
    DatabaseEngine, EngineError, EngineResult, MemoryEngine, RestoreRequest,
};
use restore_verify::notify::MemoryNotifier;
use restore_verify::pipeline::{RestoreVerifier, RunOutcome};
use restore_verify::preflight::PreconditionError;
use restore_verify::runlog::daily_files;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

struct Fixture {
    _temp: TempDir,
    ctx: RunContext,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        for dir in ["data/base", "pg_log", "backups", "logs"] {
            fs::create_dir_all(temp.path().join(dir)).unwrap();
        }
        fs::write(temp.path().join("data/base/16384"), vec![0u8; 8192]).unwrap();

        let ctx = RunContext {
            actual_host: "recovery01".into(),
            expected_host: "recovery01".into(),
            backup_dir: temp.path().join("backups"),
            dump_suffix: "test_db".into(),
            database: "test_db".into(),
            restore_jobs: 4,
            restore_timeout: None,
            engine: EngineSettings {
                bin_dir: None,
                data_dir: temp.path().join("data"),
                log_dir: temp.path().join("pg_log"),
                port: None,
                user: None,
                maintenance_db: "postgres".into(),
            },
            run_log_dir: temp.path().join("logs"),
            run_log_prefix: "restore_verify".into(),
            log_retention: 7,
            notify_recipient: "dba@example.com".into(),
            notify_enabled: true,
            audit_scope: AuditScope::SinceRestore,
            benign_patterns: vec!["autovacuum".into()],
        };

        Self { _temp: temp, ctx }
    }

    fn add_dump(&self, name: &str) -> PathBuf {
        let dir = self.ctx.backup_dir.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("toc.dat"), vec![0u8; 3000]).unwrap();
        fs::write(dir.join("3001.dat.gz"), vec![0u8; 5000]).unwrap();
        dir
    }

    fn engine_log(&self) -> PathBuf {
        self.ctx.engine.log_dir.join("postgresql-Thu.log")
    }

    fn run_log_text(&self) -> String {
        daily_files(&self.ctx.run_log_dir, &self.ctx.run_log_prefix)
            .unwrap()
            .iter()
            .map(|p| fs::read_to_string(p).unwrap())
            .collect()
    }
}

fn append(path: &Path, text: &str) {
    let mut existing = fs::read_to_string(path).unwrap_or_default();
    existing.push_str(text);
    fs::write(path, existing).unwrap();
}

fn assert_no_destructive_calls(engine: &MemoryEngine) {
    assert_eq!(
        engine.destructive_call_count(),
        0,
        "VIOLATION: precondition failure must not reach restore or drop, calls: {:?}",
        engine.calls()
    );
}

/// Engine whose restore always exceeds its time bound, after writing `stderr`
struct HangingEngine {
    stderr: &'static str,
}

impl DatabaseEngine for HangingEngine {
    fn is_running(&self) -> EngineResult<bool> {
        Ok(true)
    }

    fn database_exists(&self, _database: &str) -> EngineResult<bool> {
        Ok(false)
    }

    fn restore(&self, request: &RestoreRequest) -> EngineResult<()> {
        Err(EngineError::TimedOut {
            command: "pg_restore".into(),
            after: request.timeout.unwrap_or(Duration::from_secs(1)),
            stderr: self.stderr.to_string(),
        })
    }

    fn drop_database(&self, database: &str) -> EngineResult<()> {
        panic!("drop of {} after a timed out restore", database);
    }
}

// =============================================================================
// Preconditions
// =============================================================================

/// Wrong host aborts at WARNING with no destructive call.
#[test]
fn test_host_mismatch_aborts_before_restore() {
    let mut fixture = Fixture::new();
    fixture.add_dump("20240315_test_db");
    fixture.ctx.actual_host = "prod01".into();

    let engine = MemoryEngine::new();
    let notifier = MemoryNotifier::new();
    let outcome = RestoreVerifier::new(&fixture.ctx, &engine, &notifier).run();

    match &outcome {
        RunOutcome::Aborted(PreconditionError::HostMismatch { expected, actual }) => {
            assert_eq!(expected, "recovery01");
            assert_eq!(actual, "prod01");
        }
        other => panic!("expected host mismatch, got {:?}", other),
    }
    assert_eq!(outcome.exit_code(), 1);
    assert_no_destructive_calls(&engine);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "[restore-verify] prod01: ABORTED");
    assert!(sent[0].body.contains("reason: host mismatch"));

    assert!(fixture.run_log_text().contains("WARNING: run aborted: host mismatch"));
}

/// A missing directory aborts before the engine is even probed.
#[test]
fn test_missing_directory_aborts_without_probing() {
    let fixture = Fixture::new();
    fixture.add_dump("20240315_test_db");
    fs::remove_dir_all(&fixture.ctx.engine.log_dir).unwrap();

    let engine = MemoryEngine::new();
    let outcome = RestoreVerifier::new(&fixture.ctx, &engine, MemoryNotifier::new()).run();

    match outcome {
        RunOutcome::Aborted(PreconditionError::PathUnavailable { path, .. }) => {
            assert_eq!(path, fixture.ctx.engine.log_dir);
        }
        other => panic!("expected path failure, got {:?}", other),
    }
    assert!(engine.calls().is_empty());
}

#[test]
fn test_engine_down_aborts() {
    let fixture = Fixture::new();
    fixture.add_dump("20240315_test_db");

    let engine = MemoryEngine::new().stopped();
    let outcome = RestoreVerifier::new(&fixture.ctx, &engine, MemoryNotifier::new()).run();

    assert_eq!(outcome, RunOutcome::Aborted(PreconditionError::EngineNotRunning));
    assert_eq!(outcome.reason().as_deref(), Some("engine not running"));
    assert_no_destructive_calls(&engine);
}

#[test]
fn test_existing_target_aborts() {
    let fixture = Fixture::new();
    fixture.add_dump("20240315_test_db");

    let engine = MemoryEngine::new().with_database("test_db");
    let outcome = RestoreVerifier::new(&fixture.ctx, &engine, MemoryNotifier::new()).run();

    assert_eq!(
        outcome.reason().as_deref(),
        Some("target database already exists")
    );
    assert_no_destructive_calls(&engine);
    assert!(engine.has_database("test_db"), "existing database must be left alone");
}

#[test]
fn test_no_matching_dump_aborts() {
    let fixture = Fixture::new();
    fixture.add_dump("20240315_other_db");

    let engine = MemoryEngine::new();
    let outcome = RestoreVerifier::new(&fixture.ctx, &engine, MemoryNotifier::new()).run();

    assert_eq!(outcome.reason().as_deref(), Some("no dump matches suffix"));
    assert_no_destructive_calls(&engine);
}

#[test]
fn test_empty_backup_dir_aborts() {
    let fixture = Fixture::new();

    let engine = MemoryEngine::new();
    let outcome = RestoreVerifier::new(&fixture.ctx, &engine, MemoryNotifier::new()).run();

    assert!(matches!(
        outcome,
        RunOutcome::Aborted(PreconditionError::NoDumpMatch { .. })
    ));
    assert_no_destructive_calls(&engine);
}

// =============================================================================
// Dump Selection
// =============================================================================

#[test]
fn test_newest_dump_is_restored() {
    let fixture = Fixture::new();
    fixture.add_dump("20240101_test_db");
    let newest = fixture.add_dump("20240315_test_db");
    fixture.add_dump("20231231_test_db");

    let engine = MemoryEngine::new();
    let outcome = RestoreVerifier::new(&fixture.ctx, &engine, MemoryNotifier::new()).run();

    assert_eq!(outcome.dump().unwrap().path(), newest.as_path());
}

// =============================================================================
// Restore And Cleanup
// =============================================================================

/// Clean restore of 20180329_test_db reports stats and exits 0.
#[test]
fn test_end_to_end_success() {
    let fixture = Fixture::new();
    let dump = fixture.add_dump("20180329_test_db");

    let engine = MemoryEngine::new();
    let notifier = MemoryNotifier::new();
    let outcome = RestoreVerifier::new(&fixture.ctx, &engine, &notifier).run();

    let stats = match &outcome {
        RunOutcome::Success { stats, .. } => stats.clone(),
        other => panic!("expected success, got {:?}", other),
    };
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(stats.dump_size, Some(8000));
    assert_eq!(stats.cluster_size, Some(8192));
    assert_eq!(engine.restore_count(), 1);
    assert_eq!(engine.drop_count(), 1);
    assert!(!engine.has_database("test_db"));

    let body = notifier.last().unwrap().body;
    let path_line = format!("dump: {}\n", dump.display());
    assert!(body.contains(&path_line), "body must name the dump: {}", body);
    assert!(Regex::new(r"dump size: \d+(\.\d)?[BKMGTP]\n").unwrap().is_match(&body));
    assert!(Regex::new(r"duration: \d{2,}:\d{2}:\d{2}\n").unwrap().is_match(&body));
    assert!(Regex::new(r"cluster size: \d+(\.\d)?[BKMGTP]\n").unwrap().is_match(&body));
    assert_eq!(notifier.last().unwrap().subject, "[restore-verify] recovery01: SUCCESS");

    let log = fixture.run_log_text();
    let line = Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2} (INFO|WARNING|ERROR): ").unwrap();
    assert!(log.lines().all(|l| line.is_match(l)), "malformed run log:\n{}", log);
    assert!(log.contains("INFO: dropped database test_db"));
}

/// A duplicate key error is one warning; cleanup still runs.
#[test]
fn test_engine_error_line_is_a_warning() {
    let fixture = Fixture::new();
    fixture.add_dump("20240315_test_db");
    let log = fixture.engine_log();
    let hook_log = log.clone();

    let engine = MemoryEngine::new().with_restore_hook(move |_| {
        append(
            &hook_log,
            "2024-03-15 02:00:01 UTC [42] ERROR:  duplicate key value violates unique constraint \"t_pkey\"\n",
        );
    });
    let notifier = MemoryNotifier::new();
    let outcome = RestoreVerifier::new(&fixture.ctx, &engine, &notifier).run();

    match &outcome {
        RunOutcome::RestoredWithWarnings { warnings, .. } => {
            assert_eq!(warnings.len(), 1);
            assert!(warnings[0].contains("duplicate key"));
        }
        other => panic!("expected warnings, got {:?}", other),
    }
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(engine.drop_count(), 1, "cleanup must still run after warnings");
    assert_eq!(notifier.sent_count(), 2, "interim warning plus terminal outcome");
}

#[test]
fn test_autovacuum_noise_is_not_a_warning() {
    let fixture = Fixture::new();
    fixture.add_dump("20240315_test_db");
    let hook_log = fixture.engine_log();

    let engine = MemoryEngine::new().with_restore_hook(move |_| {
        append(
            &hook_log,
            "ERROR:  canceling autovacuum task\nERROR:  Autovacuum worker stopped\n",
        );
    });
    let outcome = RestoreVerifier::new(&fixture.ctx, &engine, MemoryNotifier::new()).run();

    assert!(matches!(outcome, RunOutcome::Success { .. }));
}

/// Errors logged before the restore started belong to someone else.
#[test]
fn test_since_restore_scope_ignores_history() {
    let mut fixture = Fixture::new();
    fixture.add_dump("20240315_test_db");
    append(&fixture.engine_log(), "FATAL:  terminating connection from last week\n");

    let engine = MemoryEngine::new();
    let outcome = RestoreVerifier::new(&fixture.ctx, &engine, MemoryNotifier::new()).run();
    assert!(matches!(outcome, RunOutcome::Success { .. }));

    fixture.ctx.audit_scope = AuditScope::Full;
    let outcome = RestoreVerifier::new(&fixture.ctx, &engine, MemoryNotifier::new()).run();
    assert!(matches!(outcome, RunOutcome::RestoredWithWarnings { .. }));
}

/// A failed restore is never cleaned up.
#[test]
fn test_restore_failure_skips_cleanup() {
    let fixture = Fixture::new();
    fixture.add_dump("20240315_test_db");

    let engine = MemoryEngine::new().failing_restore("pg_restore: error: could not execute query");
    let notifier = MemoryNotifier::new();
    let outcome = RestoreVerifier::new(&fixture.ctx, &engine, &notifier).run();

    assert!(matches!(outcome, RunOutcome::RestoreFailed { .. }));
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(engine.drop_count(), 0, "VIOLATION: failed restore must not be dropped");
    assert!(engine.has_database("test_db"));

    let last = notifier.last().unwrap();
    assert_eq!(last.subject, "[restore-verify] recovery01: RESTORE FAILED");
    assert!(last.body.contains("left in place for inspection"));
    assert!(fixture
        .run_log_text()
        .contains("ERROR: pg_restore: error: could not execute query"));
}

#[test]
fn test_restore_timeout_is_a_restore_failure() {
    let mut fixture = Fixture::new();
    fixture.add_dump("20240315_test_db");
    fixture.ctx.restore_timeout = Some(Duration::from_secs(30));

    let engine = HangingEngine { stderr: "" };
    let outcome = RestoreVerifier::new(&fixture.ctx, engine, MemoryNotifier::new()).run();

    match outcome {
        RunOutcome::RestoreFailed { reason, .. } => {
            assert_eq!(
                reason, "pg_restore timed out after 30s",
                "VIOLATION: no engine output was captured, so none may be referenced"
            );
        }
        other => panic!("expected restore failure, got {:?}", other),
    }
}

/// Output written before the kill lands in the run log the reason points at.
#[test]
fn test_restore_timeout_keeps_partial_engine_output() {
    let mut fixture = Fixture::new();
    fixture.add_dump("20240315_test_db");
    fixture.ctx.restore_timeout = Some(Duration::from_secs(30));

    let engine = HangingEngine {
        stderr: "pg_restore: processing data for table \"public.orders\"\n",
    };
    let outcome = RestoreVerifier::new(&fixture.ctx, engine, MemoryNotifier::new()).run();

    let reason = outcome.reason().unwrap();
    assert!(reason.starts_with("pg_restore timed out after 30s (engine output in "));
    assert!(fixture
        .run_log_text()
        .contains("ERROR: pg_restore: processing data for table \"public.orders\""));
}

/// A failed drop is reported and makes the next run abort.
#[test]
fn test_cleanup_failure_blocks_next_run() {
    let fixture = Fixture::new();
    fixture.add_dump("20240315_test_db");

    let engine = MemoryEngine::new().failing_drop("dropdb: error: database is being accessed by other users");
    let first = RestoreVerifier::new(&fixture.ctx, &engine, MemoryNotifier::new()).run();

    assert!(matches!(first, RunOutcome::CleanupFailed { .. }));
    assert_eq!(first.exit_code(), 1);
    assert!(first.stats().is_some(), "stats are still reported");

    let second = RestoreVerifier::new(&fixture.ctx, &engine, MemoryNotifier::new()).run();
    assert_eq!(
        second.reason().as_deref(),
        Some("target database already exists")
    );
    assert_eq!(engine.restore_count(), 1, "second run must not restore");
}

#[test]
fn test_two_sequential_runs_are_independent() {
    let fixture = Fixture::new();
    fixture.add_dump("20240315_test_db");

    let engine = MemoryEngine::new();
    for _ in 0..2 {
        let outcome = RestoreVerifier::new(&fixture.ctx, &engine, MemoryNotifier::new()).run();
        assert!(matches!(outcome, RunOutcome::Success { .. }));
    }

    assert_eq!(engine.restore_count(), 2);
    assert_eq!(engine.drop_count(), 2);
}

/// Unmeasurable sizes are reported as unknown; the outcome stands.
#[test]
fn test_measurement_failure_does_not_change_outcome() {
    let fixture = Fixture::new();
    fixture.add_dump("20240315_test_db");
    let data_dir = fixture.ctx.engine.data_dir.clone();

    let engine = MemoryEngine::new().with_restore_hook(move |_| {
        fs::remove_dir_all(&data_dir).unwrap();
    });
    let notifier = MemoryNotifier::new();
    let outcome = RestoreVerifier::new(&fixture.ctx, &engine, &notifier).run();

    match &outcome {
        RunOutcome::Success { stats, .. } => assert_eq!(stats.cluster_size, None),
        other => panic!("expected success, got {:?}", other),
    }
    assert!(notifier.last().unwrap().body.contains("cluster size: unknown\n"));
    assert!(fixture.run_log_text().contains("WARNING: could not measure cluster size"));
}

// =============================================================================
// Reporting
// =============================================================================

#[test]
fn test_disabled_notifications_still_logged() {
    let mut fixture = Fixture::new();
    fixture.add_dump("20240315_test_db");
    fixture.ctx.notify_enabled = false;

    let notifier = MemoryNotifier::new();
    let outcome = RestoreVerifier::new(&fixture.ctx, MemoryEngine::new(), &notifier).run();

    assert!(outcome.is_verified());
    assert_eq!(notifier.sent_count(), 0);
    assert!(fixture
        .run_log_text()
        .contains("INFO: notification suppressed: [restore-verify] recovery01: SUCCESS"));
}

#[test]
fn test_delivery_failure_does_not_change_outcome() {
    let fixture = Fixture::new();
    fixture.add_dump("20240315_test_db");

    let outcome = RestoreVerifier::new(
        &fixture.ctx,
        MemoryEngine::new(),
        MemoryNotifier::failing("connection refused"),
    )
    .run();

    assert!(matches!(outcome, RunOutcome::Success { .. }));
    assert!(fixture.run_log_text().contains("WARNING: notification not delivered"));
}

/// N+3 old daily files with retention N leave the N most recent.
#[test]
fn test_run_log_retention() {
    let mut fixture = Fixture::new();
    fixture.add_dump("20240315_test_db");
    fixture.ctx.log_retention = 3;

    for day in 1..=6 {
        fs::write(
            fixture.ctx.run_log_dir.join(format!("restore_verify_2020010{}.log", day)),
            "2020-01-01 00:00:00 INFO: old\n",
        )
        .unwrap();
    }

    let verifier = RestoreVerifier::new(&fixture.ctx, MemoryEngine::new(), MemoryNotifier::new());
    verifier.run();

    let remaining = daily_files(&fixture.ctx.run_log_dir, "restore_verify").unwrap();
    let names: Vec<String> = remaining
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    assert_eq!(remaining.len(), 3, "remaining: {:?}", names);
    assert!(names.contains(&"restore_verify_20200105.log".to_string()));
    assert!(names.contains(&"restore_verify_20200106.log".to_string()));
    assert!(remaining.contains(&verifier.reporter().run_log().current_path()));
}
