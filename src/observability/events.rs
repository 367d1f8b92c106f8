//! Observable events of a verification run
//!
//! Events are explicit and typed. Every pipeline transition maps to one.

use std::fmt;

/// Observable events of a verification run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Run begins
    RunStart,
    /// Terminal outcome reached
    RunComplete,

    // Preconditions
    /// Required directories are present and readable
    PathsVerified,
    /// A required directory is missing or unreadable
    PathUnavailable,
    /// Running on the designated recovery host
    HostVerified,
    /// Not running on the designated recovery host
    HostMismatch,
    /// Engine process is up
    EngineRunning,
    /// Engine process is down
    EngineNotRunning,
    /// Liveness or existence probe could not be executed
    EngineProbeFailed,
    /// Target database does not exist yet
    TargetAbsent,
    /// Target database already answers queries
    TargetExists,

    // Dump selection
    /// Dump artifact chosen
    DumpSelected,
    /// No dump matched the suffix
    NoDumpFound,

    // Restore
    /// Restore invocation begins
    RestoreStart,
    /// Restore exited successfully
    RestoreComplete,
    /// Restore exited non-zero or timed out
    RestoreFailed,

    // Audit
    /// No error markers in the engine log
    AuditClean,
    /// Error markers found in the engine log
    AuditWarnings,
    /// Engine log could not be scanned
    AuditIncomplete,

    // Stats
    /// Sizes measured
    StatsCollected,
    /// A size could not be measured
    MeasurementFailed,

    // Cleanup
    /// Recovered database dropped
    CleanupComplete,
    /// Recovered database could not be dropped
    CleanupFailed,

    // Reporting
    /// Notification delivered to the transport
    NotificationSent,
    /// Notification skipped because notifications are disabled
    NotificationSuppressed,
    /// Notification transport failed
    NotificationFailed,
    /// Run log could not be written
    RunLogWriteFailed,
    /// Old run log files removed
    RunLogRotated,
    /// Run log rotation failed
    RunLogRotationFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::RunStart => "RUN_BEGIN",
            Event::RunComplete => "RUN_COMPLETE",

            Event::PathsVerified => "PATHS_VERIFIED",
            Event::PathUnavailable => "PATH_UNAVAILABLE",
            Event::HostVerified => "HOST_VERIFIED",
            Event::HostMismatch => "HOST_MISMATCH",
            Event::EngineRunning => "ENGINE_RUNNING",
            Event::EngineNotRunning => "ENGINE_NOT_RUNNING",
            Event::EngineProbeFailed => "ENGINE_PROBE_FAILED",
            Event::TargetAbsent => "TARGET_ABSENT",
            Event::TargetExists => "TARGET_EXISTS",

            Event::DumpSelected => "DUMP_SELECTED",
            Event::NoDumpFound => "DUMP_NOT_FOUND",

            Event::RestoreStart => "RESTORE_BEGIN",
            Event::RestoreComplete => "RESTORE_COMPLETE",
            Event::RestoreFailed => "RESTORE_FAILED",

            Event::AuditClean => "AUDIT_CLEAN",
            Event::AuditWarnings => "AUDIT_WARNINGS",
            Event::AuditIncomplete => "AUDIT_INCOMPLETE",

            Event::StatsCollected => "STATS_COLLECTED",
            Event::MeasurementFailed => "MEASUREMENT_FAILED",

            Event::CleanupComplete => "CLEANUP_COMPLETE",
            Event::CleanupFailed => "CLEANUP_FAILED",

            Event::NotificationSent => "NOTIFICATION_SENT",
            Event::NotificationSuppressed => "NOTIFICATION_SUPPRESSED",
            Event::NotificationFailed => "NOTIFICATION_FAILED",
            Event::RunLogWriteFailed => "RUN_LOG_WRITE_FAILED",
            Event::RunLogRotated => "RUN_LOG_ROTATED",
            Event::RunLogRotationFailed => "RUN_LOG_ROTATION_FAILED",
        }
    }

    /// Returns true if this event ends the run with a non-zero status
    pub fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            Event::PathUnavailable
                | Event::HostMismatch
                | Event::EngineNotRunning
                | Event::EngineProbeFailed
                | Event::TargetExists
                | Event::NoDumpFound
                | Event::RestoreFailed
                | Event::CleanupFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
