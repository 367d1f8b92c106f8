//! Engine state checks
//!
//! Two gates before any restore:
//! 1. the engine is running
//! 2. the target database does not answer yet
//!
//! The restore later creates the database fresh, so a database that already
//! answers is a safety violation and never something to overwrite.

use crate::engine::DatabaseEngine;

use super::errors::{PreconditionError, PreconditionResult};

/// Fail unless the engine process is up.
pub fn check_engine_running<E: DatabaseEngine>(engine: &E) -> PreconditionResult<()> {
    match engine.is_running() {
        Ok(true) => Ok(()),
        Ok(false) => Err(PreconditionError::EngineNotRunning),
        Err(e) => Err(PreconditionError::EngineProbeFailed(e.to_string())),
    }
}

/// Fail if a connection to `database` succeeds.
pub fn check_target_absent<E: DatabaseEngine>(
    engine: &E,
    database: &str,
) -> PreconditionResult<()> {
    match engine.database_exists(database) {
        Ok(false) => Ok(()),
        Ok(true) => Err(PreconditionError::TargetExists {
            database: database.to_string(),
        }),
        Err(e) => Err(PreconditionError::EngineProbeFailed(e.to_string())),
    }
}
