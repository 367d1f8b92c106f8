//! Engine collaborator errors

use std::time::Duration;

use thiserror::Error;

/// Failures reported by a [`super::DatabaseEngine`] operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine client binary could not be started
    #[error("failed to start {command}: {detail}")]
    Spawn { command: String, detail: String },

    /// The engine client ran and reported failure
    #[error("{command} exited with {}", describe_status(.status))]
    Failed {
        command: String,
        status: Option<i32>,
        stderr: String,
    },

    /// The engine client exceeded its time bound and its process group was killed
    #[error("{command} timed out after {}s", .after.as_secs())]
    TimedOut {
        command: String,
        after: Duration,
        stderr: String,
    },

    /// Waiting on or talking to the client process failed
    #[error("I/O error while running {command}: {detail}")]
    Io { command: String, detail: String },
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl EngineError {
    /// Diagnostic output captured from the client, if any
    pub fn stderr(&self) -> Option<&str> {
        match self {
            EngineError::Failed { stderr, .. } | EngineError::TimedOut { stderr, .. }
                if !stderr.trim().is_empty() =>
            {
                Some(stderr)
            }
            _ => None,
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
