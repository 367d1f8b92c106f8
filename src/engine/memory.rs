//! In-memory engine for tests
//!
//! Keeps a set of existing databases, records every call, and can be
//! scripted to fail individual operations.

use std::cell::RefCell;
use std::collections::BTreeSet;

use super::errors::{EngineError, EngineResult};
use super::{DatabaseEngine, RestoreRequest};

/// A call observed by [`MemoryEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    IsRunning,
    DatabaseExists(String),
    Restore(RestoreRequest),
    DropDatabase(String),
}

type RestoreHook = Box<dyn Fn(&RestoreRequest)>;

/// Fake [`DatabaseEngine`] with scripted behavior.
pub struct MemoryEngine {
    running: bool,
    probe_error: Option<String>,
    restore_error: Option<String>,
    drop_error: Option<String>,
    restore_hook: Option<RestoreHook>,
    databases: RefCell<BTreeSet<String>>,
    calls: RefCell<Vec<EngineCall>>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    /// A running engine with no databases
    pub fn new() -> Self {
        Self {
            running: true,
            probe_error: None,
            restore_error: None,
            drop_error: None,
            restore_hook: None,
            databases: RefCell::new(BTreeSet::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Engine process reported down
    pub fn stopped(mut self) -> Self {
        self.running = false;
        self
    }

    /// Start with `database` already present
    pub fn with_database(self, database: impl Into<String>) -> Self {
        self.databases.borrow_mut().insert(database.into());
        self
    }

    /// Liveness and existence probes cannot be executed
    pub fn failing_probe(mut self, detail: impl Into<String>) -> Self {
        self.probe_error = Some(detail.into());
        self
    }

    /// Restore exits non-zero with `stderr`
    pub fn failing_restore(mut self, stderr: impl Into<String>) -> Self {
        self.restore_error = Some(stderr.into());
        self
    }

    /// Drop exits non-zero with `stderr`
    pub fn failing_drop(mut self, stderr: impl Into<String>) -> Self {
        self.drop_error = Some(stderr.into());
        self
    }

    /// Run `hook` while the restore is "executing", e.g. to write engine log lines
    pub fn with_restore_hook(mut self, hook: impl Fn(&RestoreRequest) + 'static) -> Self {
        self.restore_hook = Some(Box::new(hook));
        self
    }

    /// Every call so far, in order
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.borrow().clone()
    }

    /// Number of restore invocations
    pub fn restore_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, EngineCall::Restore(_)))
            .count()
    }

    /// Number of drop invocations
    pub fn drop_count(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, EngineCall::DropDatabase(_)))
            .count()
    }

    /// Number of restore or drop invocations
    pub fn destructive_call_count(&self) -> usize {
        self.restore_count() + self.drop_count()
    }

    /// Whether `database` currently exists
    pub fn has_database(&self, database: &str) -> bool {
        self.databases.borrow().contains(database)
    }

    fn record(&self, call: EngineCall) {
        self.calls.borrow_mut().push(call);
    }

    fn probe_failure(&self, command: &str) -> EngineResult<()> {
        match &self.probe_error {
            Some(detail) => Err(EngineError::Spawn {
                command: command.to_string(),
                detail: detail.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl DatabaseEngine for MemoryEngine {
    fn is_running(&self) -> EngineResult<bool> {
        self.record(EngineCall::IsRunning);
        self.probe_failure("pg_ctl")?;
        Ok(self.running)
    }

    fn database_exists(&self, database: &str) -> EngineResult<bool> {
        self.record(EngineCall::DatabaseExists(database.to_string()));
        self.probe_failure("psql")?;
        Ok(self.running && self.has_database(database))
    }

    fn restore(&self, request: &RestoreRequest) -> EngineResult<()> {
        self.record(EngineCall::Restore(request.clone()));

        if let Some(hook) = &self.restore_hook {
            hook(request);
        }

        if self.has_database(&request.database) {
            return Err(EngineError::Failed {
                command: "pg_restore".into(),
                status: Some(1),
                stderr: format!("database \"{}\" already exists", request.database),
            });
        }

        // A failed restore still leaves the half-created database behind
        self.databases.borrow_mut().insert(request.database.clone());

        match &self.restore_error {
            Some(stderr) => Err(EngineError::Failed {
                command: "pg_restore".into(),
                status: Some(1),
                stderr: stderr.clone(),
            }),
            None => Ok(()),
        }
    }

    fn drop_database(&self, database: &str) -> EngineResult<()> {
        self.record(EngineCall::DropDatabase(database.to_string()));

        if let Some(stderr) = &self.drop_error {
            return Err(EngineError::Failed {
                command: "dropdb".into(),
                status: Some(1),
                stderr: stderr.clone(),
            });
        }

        if !self.databases.borrow_mut().remove(database) {
            return Err(EngineError::Failed {
                command: "dropdb".into(),
                status: Some(1),
                stderr: format!("database \"{}\" does not exist", database),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RestoreMode;
    use std::path::PathBuf;

    fn request(database: &str) -> RestoreRequest {
        RestoreRequest {
            dump_path: PathBuf::from("/backups/20240101_db"),
            database: database.to_string(),
            jobs: 2,
            mode: RestoreMode::CreateFresh,
            timeout: None,
        }
    }

    #[test]
    fn test_restore_then_drop_round_trip() {
        let engine = MemoryEngine::new();

        engine.restore(&request("db")).unwrap();
        assert!(engine.database_exists("db").unwrap());

        engine.drop_database("db").unwrap();
        assert!(!engine.database_exists("db").unwrap());
        assert_eq!(engine.destructive_call_count(), 2);
    }

    #[test]
    fn test_restore_refuses_existing_database() {
        let engine = MemoryEngine::new().with_database("db");
        assert!(engine.restore(&request("db")).is_err());
    }

    #[test]
    fn test_failing_restore_leaves_database() {
        let engine = MemoryEngine::new().failing_restore("out of disk");
        let err = engine.restore(&request("db")).unwrap_err();

        assert_eq!(err.stderr(), Some("out of disk"));
        assert!(engine.has_database("db"));
    }

    #[test]
    fn test_failing_drop_keeps_database() {
        let engine = MemoryEngine::new().failing_drop("in use");
        engine.restore(&request("db")).unwrap();

        assert!(engine.drop_database("db").is_err());
        assert!(engine.has_database("db"));
    }

    #[test]
    fn test_stopped_engine_answers_no_queries() {
        let engine = MemoryEngine::new().stopped().with_database("db");
        assert!(!engine.is_running().unwrap());
        assert!(!engine.database_exists("db").unwrap());
    }

    #[test]
    fn test_calls_are_recorded_in_order() {
        let engine = MemoryEngine::new();
        engine.is_running().unwrap();
        engine.database_exists("db").unwrap();

        assert_eq!(
            engine.calls(),
            vec![EngineCall::IsRunning, EngineCall::DatabaseExists("db".into())]
        );
    }
}
