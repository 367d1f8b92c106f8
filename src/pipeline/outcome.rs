//! Terminal outcome of a verification run

use std::fmt;
use std::time::Duration;

use crate::dump::DumpArtifact;
use crate::observability::{Event, Severity};
use crate::preflight::PreconditionError;
use crate::stats::{format_duration, Stats};

/// Exit status for runs that verified the dump
pub const EXIT_OK: i32 = 0;
/// Exit status for runs that aborted or failed
pub const EXIT_FAILED: i32 = 1;

/// The single result of a run.
///
/// Produced once, when the pipeline terminates. It drives the final
/// notification, the terminal run log entry and the exit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A precondition failed; nothing destructive ran
    Aborted(PreconditionError),

    /// The restore reported failure; the database is left for inspection
    RestoreFailed {
        dump: DumpArtifact,
        reason: String,
        elapsed: Duration,
    },

    /// Restore and cleanup succeeded but the engine logged errors
    RestoredWithWarnings {
        dump: DumpArtifact,
        stats: Stats,
        warnings: Vec<String>,
    },

    /// Restore, audit and cleanup all clean
    Success { dump: DumpArtifact, stats: Stats },

    /// The restore was verified but the database could not be dropped
    CleanupFailed {
        dump: DumpArtifact,
        stats: Stats,
        reason: String,
    },
}

impl RunOutcome {
    /// Short upper-case label used in subjects and logs
    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::Aborted(_) => "ABORTED",
            RunOutcome::RestoreFailed { .. } => "RESTORE FAILED",
            RunOutcome::RestoredWithWarnings { .. } => "RESTORED WITH WARNINGS",
            RunOutcome::Success { .. } => "SUCCESS",
            RunOutcome::CleanupFailed { .. } => "CLEANUP FAILED",
        }
    }

    /// Stable code for log correlation
    pub fn code(&self) -> &'static str {
        match self {
            RunOutcome::Aborted(e) => e.code(),
            RunOutcome::RestoreFailed { .. } => "RV_RESTORE_FAILED",
            RunOutcome::RestoredWithWarnings { .. } => "RV_POST_RESTORE_WARNING",
            RunOutcome::Success { .. } => "RV_OK",
            RunOutcome::CleanupFailed { .. } => "RV_CLEANUP_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            RunOutcome::Aborted(e) => e.severity(),
            RunOutcome::RestoreFailed { .. } | RunOutcome::CleanupFailed { .. } => Severity::Error,
            RunOutcome::RestoredWithWarnings { .. } => Severity::Warning,
            RunOutcome::Success { .. } => Severity::Info,
        }
    }

    /// Console event of the terminal entry
    pub fn event(&self) -> Event {
        match self {
            RunOutcome::Aborted(e) => e.event(),
            RunOutcome::RestoreFailed { .. } => Event::RestoreFailed,
            RunOutcome::CleanupFailed { .. } => Event::CleanupFailed,
            RunOutcome::RestoredWithWarnings { .. } | RunOutcome::Success { .. } => {
                Event::RunComplete
            }
        }
    }

    /// Whether the dump was restored and the host left clean
    pub fn is_verified(&self) -> bool {
        matches!(
            self,
            RunOutcome::Success { .. } | RunOutcome::RestoredWithWarnings { .. }
        )
    }

    /// Process exit status
    pub fn exit_code(&self) -> i32 {
        if self.is_verified() {
            EXIT_OK
        } else {
            EXIT_FAILED
        }
    }

    /// Dump the run worked on, once one was selected
    pub fn dump(&self) -> Option<&DumpArtifact> {
        match self {
            RunOutcome::Aborted(_) => None,
            RunOutcome::RestoreFailed { dump, .. }
            | RunOutcome::RestoredWithWarnings { dump, .. }
            | RunOutcome::Success { dump, .. }
            | RunOutcome::CleanupFailed { dump, .. } => Some(dump),
        }
    }

    /// Stats, when the restore got far enough to collect them
    pub fn stats(&self) -> Option<&Stats> {
        match self {
            RunOutcome::RestoredWithWarnings { stats, .. }
            | RunOutcome::Success { stats, .. }
            | RunOutcome::CleanupFailed { stats, .. } => Some(stats),
            RunOutcome::Aborted(_) | RunOutcome::RestoreFailed { .. } => None,
        }
    }

    /// Failure reason, if the run failed
    pub fn reason(&self) -> Option<String> {
        match self {
            RunOutcome::Aborted(e) => Some(e.to_string()),
            RunOutcome::RestoreFailed { reason, .. } | RunOutcome::CleanupFailed { reason, .. } => {
                Some(reason.clone())
            }
            RunOutcome::RestoredWithWarnings { .. } | RunOutcome::Success { .. } => None,
        }
    }

    /// One-line summary for the terminal run log entry
    pub fn summary(&self) -> String {
        match self {
            RunOutcome::Aborted(e) => {
                let details = e.details();
                if details.is_empty() {
                    format!("run aborted: {}", e)
                } else {
                    format!("run aborted: {} ({})", e, details.join("; "))
                }
            }
            RunOutcome::RestoreFailed {
                dump,
                reason,
                elapsed,
            } => format!(
                "restore of {} failed after {}: {}",
                dump.path().display(),
                format_duration(*elapsed),
                reason
            ),
            RunOutcome::RestoredWithWarnings {
                dump,
                stats,
                warnings,
            } => format!(
                "restore of {} completed with {} warning(s); {}",
                dump.path().display(),
                warnings.len(),
                stats_line(stats)
            ),
            RunOutcome::Success { dump, stats } => format!(
                "restore of {} verified; {}",
                dump.path().display(),
                stats_line(stats)
            ),
            RunOutcome::CleanupFailed {
                dump,
                stats,
                reason,
            } => format!(
                "restore of {} verified but cleanup failed: {}; {}",
                dump.path().display(),
                reason,
                stats_line(stats)
            ),
        }
    }
}

fn stats_line(stats: &Stats) -> String {
    format!(
        "dump size {}, duration {}, cluster size {}",
        stats.dump_size_display(),
        stats.duration_display(),
        stats.cluster_size_display()
    )
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code(), self.summary())
    }
}
