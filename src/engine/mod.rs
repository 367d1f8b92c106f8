//! Database engine collaborator
//!
//! The pipeline never talks to the engine directly. Everything it needs is
//! behind [`DatabaseEngine`]:
//!
//! - liveness of the engine process
//! - an existence probe for the target database
//! - restore from a directory-format dump, always into a freshly created database
//! - dropping the recovered database
//!
//! [`PostgresEngine`] drives the PostgreSQL client binaries;
//! [`MemoryEngine`] is an in-memory stand-in for tests.

mod errors;
mod memory;
mod postgres;
pub mod process;

pub use errors::{EngineError, EngineResult};
pub use memory::{EngineCall, MemoryEngine};
pub use postgres::PostgresEngine;

use std::path::PathBuf;
use std::time::Duration;

/// How the restore treats the target database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreMode {
    /// Create the database from the dump; fail if it exists
    CreateFresh,
}

/// One restore invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreRequest {
    /// Directory-format dump to restore
    pub dump_path: PathBuf,
    /// Database the dump recreates
    pub database: String,
    /// Worker count inside the restore
    pub jobs: u32,
    /// Target mode
    pub mode: RestoreMode,
    /// Bound on the invocation; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

/// Operations the verification pipeline needs from the engine.
pub trait DatabaseEngine {
    /// Whether the engine process is up
    fn is_running(&self) -> EngineResult<bool>;

    /// Whether a connection to `database` succeeds.
    ///
    /// A refused connection is `Ok(false)`; `Err` means the probe itself
    /// could not be executed.
    fn database_exists(&self, database: &str) -> EngineResult<bool>;

    /// Restore a dump
    fn restore(&self, request: &RestoreRequest) -> EngineResult<()>;

    /// Drop `database`
    fn drop_database(&self, database: &str) -> EngineResult<()>;
}

impl<E: DatabaseEngine + ?Sized> DatabaseEngine for &E {
    fn is_running(&self) -> EngineResult<bool> {
        (**self).is_running()
    }

    fn database_exists(&self, database: &str) -> EngineResult<bool> {
        (**self).database_exists(database)
    }

    fn restore(&self, request: &RestoreRequest) -> EngineResult<()> {
        (**self).restore(request)
    }

    fn drop_database(&self, database: &str) -> EngineResult<()> {
        (**self).drop_database(database)
    }
}
