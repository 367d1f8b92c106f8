//! Verification pipeline
//!
//! One run walks a fixed sequence of stages:
//!
//! ```text
//! paths -> host -> engine running -> target absent -> dump selected
//!       -> restore -> audit -> stats -> cleanup -> notify -> rotate
//! ```
//!
//! Any precondition failure ends the run before the restore, so a
//! misconfigured or wrong host never reaches a destructive step. A failed
//! restore skips cleanup and leaves the database for inspection. Audit
//! findings and measurement failures are warnings: the run continues to
//! cleanup. A failed cleanup makes the next run abort at the target check.
//!
//! Stages run strictly in sequence; the only timed step is the restore.

mod outcome;
mod report;

pub use outcome::{RunOutcome, EXIT_FAILED, EXIT_OK};
pub use report::{Reporter, SUBJECT_PREFIX};

use std::time::Instant;

use crate::audit::{LogAuditor, LogCursor};
use crate::context::{AuditScope, RunContext};
use crate::dump::{self, DumpArtifact};
use crate::engine::{DatabaseEngine, EngineError, RestoreMode, RestoreRequest};
use crate::notify::Notifier;
use crate::observability::{Event, Severity};
use crate::preflight::{
    check_engine_running, check_host, check_target_absent, validate_paths, PreconditionResult,
};
use crate::stats::{self, format_duration};

/// Drives one verification run against an engine.
pub struct RestoreVerifier<'a, E: DatabaseEngine, N: Notifier> {
    ctx: &'a RunContext,
    engine: E,
    reporter: Reporter<N>,
}

impl<'a, E: DatabaseEngine, N: Notifier> RestoreVerifier<'a, E, N> {
    pub fn new(ctx: &'a RunContext, engine: E, notifier: N) -> Self {
        Self {
            ctx,
            engine,
            reporter: Reporter::new(ctx, notifier),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn reporter(&self) -> &Reporter<N> {
        &self.reporter
    }

    /// Execute a full run and report its outcome.
    pub fn run(&self) -> RunOutcome {
        self.reporter.record(
            Event::RunStart,
            Severity::Info,
            &format!(
                "run {} started on {} for database {}",
                self.reporter.run_id(),
                self.ctx.actual_host,
                self.ctx.database
            ),
        );

        let outcome = match self.preflight() {
            Ok(dump) => self.verify(dump),
            Err(e) => RunOutcome::Aborted(e),
        };

        self.finish(&outcome);
        outcome
    }

    /// Run every non-destructive check and select the dump.
    ///
    /// Stops at the first failing check. Nothing here touches the engine
    /// beyond read-only probes.
    pub fn preflight(&self) -> PreconditionResult<DumpArtifact> {
        let ctx = self.ctx;

        validate_paths(&ctx.required_paths())?;
        self.reporter.record(
            Event::PathsVerified,
            Severity::Info,
            "required directories are present and readable",
        );

        check_host(&ctx.expected_host, &ctx.actual_host)?;
        self.reporter.record(
            Event::HostVerified,
            Severity::Info,
            &format!("running on recovery host {}", ctx.actual_host),
        );

        check_engine_running(&self.engine)?;
        self.reporter
            .record(Event::EngineRunning, Severity::Info, "engine is running");

        check_target_absent(&self.engine, &ctx.database)?;
        self.reporter.record(
            Event::TargetAbsent,
            Severity::Info,
            &format!("database {} does not exist", ctx.database),
        );

        let dump = dump::select_latest(&ctx.backup_dir, &ctx.dump_suffix)?;
        self.reporter.record(
            Event::DumpSelected,
            Severity::Info,
            &format!("selected dump {}", dump.path().display()),
        );

        Ok(dump)
    }

    /// [`Self::preflight`] for the standalone command: a blocked check is
    /// written to the run log as well.
    pub fn check(&self) -> PreconditionResult<DumpArtifact> {
        self.preflight().map_err(|e| {
            let details = e.details();
            let message = if details.is_empty() {
                format!("preflight blocked: {}", e)
            } else {
                format!("preflight blocked: {} ({})", e, details.join("; "))
            };
            self.reporter.record(e.event(), e.severity(), &message);
            e
        })
    }

    fn verify(&self, dump: DumpArtifact) -> RunOutcome {
        let ctx = self.ctx;
        let cursor = self.capture_cursor();

        let request = RestoreRequest {
            dump_path: dump.path().to_path_buf(),
            database: ctx.database.clone(),
            jobs: ctx.restore_jobs,
            mode: RestoreMode::CreateFresh,
            timeout: ctx.restore_timeout,
        };

        self.reporter.record(
            Event::RestoreStart,
            Severity::Info,
            &format!(
                "restoring {} into {} with {} job(s)",
                dump.path().display(),
                ctx.database,
                ctx.restore_jobs.max(1)
            ),
        );

        let started = Instant::now();
        if let Err(e) = self.engine.restore(&request) {
            let elapsed = started.elapsed();
            self.record_engine_output(Event::RestoreFailed, &e);
            let reason = match e.stderr() {
                Some(_) => format!(
                    "{} (engine output in {})",
                    e,
                    self.reporter.run_log().current_path().display()
                ),
                None => e.to_string(),
            };
            return RunOutcome::RestoreFailed {
                dump,
                reason,
                elapsed,
            };
        }
        self.reporter.record(
            Event::RestoreComplete,
            Severity::Info,
            &format!("restore completed in {}", format_duration(started.elapsed())),
        );

        let warnings = self.audit(&dump, cursor.as_ref());

        let sizes = stats::measure(&dump, &ctx.engine.data_dir);
        for failure in &sizes.failures {
            self.reporter.record(
                Event::MeasurementFailed,
                Severity::Warning,
                &failure.to_string(),
            );
        }

        let cleanup = self.engine.drop_database(&ctx.database);
        let stats = sizes.into_stats(started.elapsed());
        self.reporter.record(
            Event::StatsCollected,
            Severity::Info,
            &format!(
                "dump size {}, duration {}, cluster size {}",
                stats.dump_size_display(),
                stats.duration_display(),
                stats.cluster_size_display()
            ),
        );

        match cleanup {
            Err(e) => {
                self.record_engine_output(Event::CleanupFailed, &e);
                RunOutcome::CleanupFailed {
                    dump,
                    stats,
                    reason: format!(
                        "could not drop {}: {}; the next run will abort until it is dropped",
                        ctx.database, e
                    ),
                }
            }
            Ok(()) => {
                self.reporter.record(
                    Event::CleanupComplete,
                    Severity::Info,
                    &format!("dropped database {}", ctx.database),
                );
                if warnings.is_empty() {
                    RunOutcome::Success { dump, stats }
                } else {
                    RunOutcome::RestoredWithWarnings {
                        dump,
                        stats,
                        warnings,
                    }
                }
            }
        }
    }

    fn capture_cursor(&self) -> Option<LogCursor> {
        if self.ctx.audit_scope == AuditScope::Full {
            return None;
        }

        match LogCursor::capture(&self.ctx.engine.log_dir) {
            Ok(cursor) => Some(cursor),
            Err(e) => {
                self.reporter.record(
                    Event::AuditIncomplete,
                    Severity::Warning,
                    &format!(
                        "could not record engine log positions ({}); the audit will read every log in full",
                        e
                    ),
                );
                None
            }
        }
    }

    /// Scan the engine log. Every finding, or the reason the scan could
    /// not finish, comes back as one warning line.
    fn audit(&self, dump: &DumpArtifact, cursor: Option<&LogCursor>) -> Vec<String> {
        let log_dir = &self.ctx.engine.log_dir;

        let warnings = match LogAuditor::new(self.ctx.benign_patterns.as_slice()) {
            Err(e) => vec![format!("engine log audit skipped: invalid benign pattern: {}", e)],
            Ok(auditor) => match auditor.scan(log_dir, cursor) {
                Ok(findings) => findings.iter().map(|f| f.to_string()).collect(),
                Err(e) => vec![format!(
                    "engine log audit incomplete for {}: {}",
                    log_dir.display(),
                    e
                )],
            },
        };

        if warnings.is_empty() {
            self.reporter.record(
                Event::AuditClean,
                Severity::Info,
                &format!("no errors in engine logs under {}", log_dir.display()),
            );
            return warnings;
        }

        self.reporter.record(
            Event::AuditWarnings,
            Severity::Warning,
            &format!(
                "engine log audit reported {} warning(s):\n{}",
                warnings.len(),
                warnings.join("\n")
            ),
        );
        self.reporter
            .notify(&self.reporter.warnings_notification(dump, &warnings));

        warnings
    }

    fn record_engine_output(&self, event: Event, error: &EngineError) {
        let mut message = error.to_string();
        if let Some(stderr) = error.stderr() {
            let stderr = stderr.trim_end();
            if !stderr.is_empty() {
                message.push('\n');
                message.push_str(stderr);
            }
        }
        self.reporter.record(event, Severity::Error, &message);
    }

    fn finish(&self, outcome: &RunOutcome) {
        self.reporter
            .record(outcome.event(), outcome.severity(), &outcome.summary());
        self.reporter
            .notify(&self.reporter.outcome_notification(self.ctx, outcome));
        self.reporter.rotate(self.ctx.log_retention);
    }
}
