//! Run reporting
//!
//! Every state transition goes to the run log and to the console; every
//! notification is mirrored into the run log. Reporting never fails a run:
//! a run log write error is surfaced on the console, a delivery error is
//! recorded as a warning.

use std::path::PathBuf;

use uuid::Uuid;

use super::outcome::RunOutcome;
use crate::context::RunContext;
use crate::dump::DumpArtifact;
use crate::notify::{Notification, Notifier};
use crate::observability::{log_event_with_fields, Event, Severity};
use crate::runlog::{LogEntry, RunLog};

/// Subject prefix of every notification
pub const SUBJECT_PREFIX: &str = "[restore-verify]";

/// Writes the run log, the console and the notifications of one run.
pub struct Reporter<N: Notifier> {
    run_id: Uuid,
    host: String,
    run_log: RunLog,
    notifier: N,
    notify_enabled: bool,
}

impl<N: Notifier> Reporter<N> {
    pub fn new(ctx: &RunContext, notifier: N) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            host: ctx.actual_host.clone(),
            run_log: RunLog::new(&ctx.run_log_dir, ctx.run_log_prefix.clone()),
            notifier,
            notify_enabled: ctx.notify_enabled,
        }
    }

    /// Identifier stamped on every console event of this run
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn run_log(&self) -> &RunLog {
        &self.run_log
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Record a transition in the run log and on the console.
    pub fn record(&self, event: Event, severity: Severity, message: &str) {
        let run_id = self.run_id.to_string();
        log_event_with_fields(
            event,
            severity,
            &[("run_id", run_id.as_str()), ("message", message)],
        );

        if let Err(e) = self.run_log.append(&LogEntry::now(severity, message)) {
            let path = self.run_log.current_path().display().to_string();
            let error = e.to_string();
            log_event_with_fields(
                Event::RunLogWriteFailed,
                Severity::Error,
                &[
                    ("run_id", run_id.as_str()),
                    ("path", path.as_str()),
                    ("error", error.as_str()),
                ],
            );
        }
    }

    /// Deliver a notification, or record why it was not delivered.
    ///
    /// Returns whether the notification was handed to the transport.
    pub fn notify(&self, notification: &Notification) -> bool {
        if !self.notify_enabled {
            self.record(
                Event::NotificationSuppressed,
                Severity::Info,
                &format!("notification suppressed: {}", notification.subject),
            );
            return false;
        }

        match self.notifier.send(notification) {
            Ok(()) => {
                self.record(
                    Event::NotificationSent,
                    Severity::Info,
                    &format!("notification sent: {}", notification.subject),
                );
                true
            }
            Err(e) => {
                self.record(
                    Event::NotificationFailed,
                    Severity::Warning,
                    &format!("notification not delivered ({}): {}", e, notification.subject),
                );
                false
            }
        }
    }

    /// Remove run log files beyond `retain`. Failures are warnings.
    pub fn rotate(&self, retain: usize) -> Vec<PathBuf> {
        match self.run_log.rotate(retain) {
            Ok(removed) => {
                if !removed.is_empty() {
                    let names: Vec<String> = removed
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect();
                    self.record(
                        Event::RunLogRotated,
                        Severity::Info,
                        &format!("removed old run logs: {}", names.join(", ")),
                    );
                }
                removed
            }
            Err(e) => {
                self.record(
                    Event::RunLogRotationFailed,
                    Severity::Warning,
                    &format!("run log rotation failed: {}", e),
                );
                Vec::new()
            }
        }
    }

    /// Notification for a terminal outcome
    pub fn outcome_notification(&self, ctx: &RunContext, outcome: &RunOutcome) -> Notification {
        let subject = format!("{} {}: {}", SUBJECT_PREFIX, self.host, outcome.label());

        let mut body = vec![
            format!("host: {}", self.host),
            format!("database: {}", ctx.database),
            format!("outcome: {}", outcome.label()),
        ];

        if let Some(reason) = outcome.reason() {
            body.push(format!("reason: {}", reason));
        }
        if let RunOutcome::Aborted(e) = outcome {
            body.extend(e.details());
        }

        if let Some(dump) = outcome.dump() {
            body.push(format!("dump: {}", dump.path().display()));
        }

        match outcome {
            RunOutcome::RestoreFailed { elapsed, .. } => {
                body.push(format!("duration: {}", crate::stats::format_duration(*elapsed)));
                body.push(format!(
                    "the database {} was left in place for inspection",
                    ctx.database
                ));
            }
            _ => {
                if let Some(stats) = outcome.stats() {
                    body.push(format!("dump size: {}", stats.dump_size_display()));
                    body.push(format!("duration: {}", stats.duration_display()));
                    body.push(format!("cluster size: {}", stats.cluster_size_display()));
                }
            }
        }

        if let RunOutcome::RestoredWithWarnings { warnings, .. } = outcome {
            body.push(format!("warnings ({}):", warnings.len()));
            body.extend(warnings.iter().map(|w| format!("  {}", w)));
        }

        body.push(format!("run log: {}", self.run_log.current_path().display()));
        body.push(format!("run id: {}", self.run_id));

        Notification::new(subject, join_body(body))
    }

    /// Interim notification for errors found in the engine log
    pub fn warnings_notification(&self, dump: &DumpArtifact, warnings: &[String]) -> Notification {
        let subject = format!("{} {}: POST-RESTORE WARNINGS", SUBJECT_PREFIX, self.host);

        let mut body = vec![
            format!("host: {}", self.host),
            format!("dump: {}", dump.path().display()),
            format!("warnings ({}):", warnings.len()),
        ];
        body.extend(warnings.iter().map(|w| format!("  {}", w)));
        body.push("cleanup will still run".to_string());

        Notification::new(subject, join_body(body))
    }
}

fn join_body(lines: Vec<String>) -> String {
    let mut body = lines.join("\n");
    body.push('\n');
    body
}
