//! Precondition failures
//!
//! Every precondition failure is fatal and happens before any destructive
//! step. The `Display` form is the abort reason reported to the operator;
//! the remaining fields are diagnostic context.

use std::path::PathBuf;

use thiserror::Error;

use crate::observability::{Event, Severity};

/// Why a run aborted before the restore started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    /// A required directory is missing, not a directory, or cannot be listed
    #[error("path missing or unreadable: {}", .path.display())]
    PathUnavailable { path: PathBuf, detail: String },

    /// Not running on the designated recovery host
    #[error("host mismatch")]
    HostMismatch { expected: String, actual: String },

    /// Engine process is not up
    #[error("engine not running")]
    EngineNotRunning,

    /// A liveness or existence probe could not be executed at all
    #[error("engine probe failed: {0}")]
    EngineProbeFailed(String),

    /// The target database already answers queries
    #[error("target database already exists")]
    TargetExists { database: String },

    /// No entry of the backup directory contains the suffix
    #[error("no dump matches suffix")]
    NoDumpMatch { backup_dir: PathBuf, suffix: String },
}

impl PreconditionError {
    /// Stable code for log correlation
    pub fn code(&self) -> &'static str {
        match self {
            PreconditionError::PathUnavailable { .. } => "RV_PRECONDITION_PATH",
            PreconditionError::HostMismatch { .. } => "RV_PRECONDITION_HOST",
            PreconditionError::EngineNotRunning => "RV_PRECONDITION_ENGINE_DOWN",
            PreconditionError::EngineProbeFailed(_) => "RV_PRECONDITION_ENGINE_PROBE",
            PreconditionError::TargetExists { .. } => "RV_PRECONDITION_TARGET_EXISTS",
            PreconditionError::NoDumpMatch { .. } => "RV_PRECONDITION_NO_DUMP",
        }
    }

    /// Host mismatch is an operator misconfiguration, not a crash.
    pub fn severity(&self) -> Severity {
        match self {
            PreconditionError::HostMismatch { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Console event for this failure
    pub fn event(&self) -> Event {
        match self {
            PreconditionError::PathUnavailable { .. } => Event::PathUnavailable,
            PreconditionError::HostMismatch { .. } => Event::HostMismatch,
            PreconditionError::EngineNotRunning => Event::EngineNotRunning,
            PreconditionError::EngineProbeFailed(_) => Event::EngineProbeFailed,
            PreconditionError::TargetExists { .. } => Event::TargetExists,
            PreconditionError::NoDumpMatch { .. } => Event::NoDumpFound,
        }
    }

    /// Context lines for the notification body, beyond the reason itself
    pub fn details(&self) -> Vec<String> {
        match self {
            PreconditionError::PathUnavailable { detail, .. } => vec![format!("cause: {}", detail)],
            PreconditionError::HostMismatch { expected, actual } => vec![
                format!("expected host: {}", expected),
                format!("actual host: {}", actual),
            ],
            PreconditionError::EngineNotRunning | PreconditionError::EngineProbeFailed(_) => {
                Vec::new()
            }
            PreconditionError::TargetExists { database } => vec![
                format!("database: {}", database),
                "a previous run may have failed to clean up; drop it manually".to_string(),
            ],
            PreconditionError::NoDumpMatch { backup_dir, suffix } => vec![
                format!("backup directory: {}", backup_dir.display()),
                format!("suffix: {}", suffix),
            ],
        }
    }
}

/// Result type for precondition checks
pub type PreconditionResult<T> = Result<T, PreconditionError>;
