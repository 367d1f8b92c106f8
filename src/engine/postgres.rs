//! PostgreSQL engine driven through its client binaries
//!
//! - liveness: `pg_ctl status -D <data_dir>`
//! - existence check: `psql -X -At --no-password --dbname <db> --command "SELECT 1"`
//! - restore: `pg_restore --create --dbname <maintenance_db> --jobs <n> <dump>`
//! - drop: `dropdb <db>`
//!
//! With `--create`, `pg_restore` connects to the maintenance database and
//! issues `CREATE DATABASE` for the database recorded in the dump, so the
//! configured target name must match the dumped database.

use std::path::PathBuf;
use std::process::Command;

use crate::context::EngineSettings;

use super::errors::{EngineError, EngineResult};
use super::process::{command_label, run, run_checked, ProcessOutput};
use super::{DatabaseEngine, RestoreMode, RestoreRequest};

/// [`DatabaseEngine`] backed by the PostgreSQL command-line clients.
#[derive(Debug, Clone)]
pub struct PostgresEngine {
    settings: EngineSettings,
}

impl PostgresEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    fn binary(&self, name: &str) -> PathBuf {
        match &self.settings.bin_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    fn with_connection_args(&self, command: &mut Command) {
        if let Some(port) = self.settings.port {
            command.arg("--port").arg(port.to_string());
        }
        if let Some(user) = &self.settings.user {
            command.arg("--username").arg(user);
        }
        // Never block on a password prompt
        command.arg("--no-password");
    }

    fn status_command(&self) -> Command {
        let mut command = Command::new(self.binary("pg_ctl"));
        command.arg("status").arg("-D").arg(&self.settings.data_dir);
        command
    }

    fn probe_command(&self, database: &str) -> Command {
        let mut command = Command::new(self.binary("psql"));
        command.arg("-X").arg("-At");
        self.with_connection_args(&mut command);
        command
            .arg("--dbname")
            .arg(database)
            .arg("--command")
            .arg("SELECT 1");
        command
    }

    fn restore_command(&self, request: &RestoreRequest) -> Command {
        let mut command = Command::new(self.binary("pg_restore"));
        match request.mode {
            RestoreMode::CreateFresh => {
                command
                    .arg("--create")
                    .arg("--dbname")
                    .arg(&self.settings.maintenance_db);
            }
        }
        command
            .arg("--format")
            .arg("directory")
            .arg("--jobs")
            .arg(request.jobs.max(1).to_string());
        self.with_connection_args(&mut command);
        command.arg(&request.dump_path);
        command
    }

    fn drop_command(&self, database: &str) -> Command {
        let mut command = Command::new(self.binary("dropdb"));
        self.with_connection_args(&mut command);
        command
            .arg("--maintenance-db")
            .arg(&self.settings.maintenance_db)
            .arg(database);
        command
    }
}

fn unexpected_status(command: String, output: ProcessOutput) -> EngineError {
    EngineError::Failed {
        command,
        status: output.status.code(),
        stderr: output.stderr,
    }
}

impl DatabaseEngine for PostgresEngine {
    fn is_running(&self) -> EngineResult<bool> {
        let command = self.status_command();
        let label = command_label(&command);
        let output = run(command, None)?;
        // pg_ctl status: 0 running, 3 not running, 4 no accessible data directory
        match output.status.code() {
            Some(0) => Ok(true),
            Some(3) | Some(4) => Ok(false),
            _ => Err(unexpected_status(label, output)),
        }
    }

    fn database_exists(&self, database: &str) -> EngineResult<bool> {
        let command = self.probe_command(database);
        let label = command_label(&command);
        let output = run(command, None)?;
        // psql exits 2 for any failed connection; only a missing database means absent
        match output.status.code() {
            Some(0) => Ok(true),
            Some(2) if output.stderr.contains("does not exist") => Ok(false),
            _ => Err(unexpected_status(label, output)),
        }
    }

    fn restore(&self, request: &RestoreRequest) -> EngineResult<()> {
        run_checked(self.restore_command(request), request.timeout)?;
        Ok(())
    }

    fn drop_database(&self, database: &str) -> EngineResult<()> {
        run_checked(self.drop_command(database), None)?;
        Ok(())
    }
}


#[cfg(all(test, unix))]
mod exit_status_tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    /// Install a stand-in client that writes `stderr` and exits with `code`
    fn install(bin_dir: &Path, name: &str, stderr: &str, code: i32) {
        let path = bin_dir.join(name);
        let script = format!("#!/bin/sh\nprintf '%s\\n' '{}' >&2\nexit {}\n", stderr, code);
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn engine(bin_dir: &TempDir) -> PostgresEngine {
        PostgresEngine::new(EngineSettings {
            bin_dir: Some(bin_dir.path().to_path_buf()),
            data_dir: bin_dir.path().join("data"),
            log_dir: bin_dir.path().join("log"),
            port: None,
            user: None,
            maintenance_db: "postgres".into(),
        })
    }

    #[test]
    fn test_pg_ctl_status_zero_is_running() {
        let bin = TempDir::new().unwrap();
        install(bin.path(), "pg_ctl", "pg_ctl: server is running (PID: 4242)", 0);
        assert!(engine(&bin).is_running().unwrap());
    }

    #[test]
    fn test_pg_ctl_status_three_is_stopped() {
        let bin = TempDir::new().unwrap();
        install(bin.path(), "pg_ctl", "pg_ctl: no server running", 3);
        assert!(!engine(&bin).is_running().unwrap());
    }

    #[test]
    fn test_pg_ctl_unexpected_status_is_an_error() {
        let bin = TempDir::new().unwrap();
        install(bin.path(), "pg_ctl", "pg_ctl: could not read file", 1);

        let err = engine(&bin).is_running().unwrap_err();
        assert!(matches!(
            err,
            EngineError::Failed { status: Some(1), .. }
        ));
        assert_eq!(err.stderr().map(str::trim), Some("pg_ctl: could not read file"));
    }

    #[test]
    fn test_psql_success_means_database_exists() {
        let bin = TempDir::new().unwrap();
        install(bin.path(), "psql", "", 0);
        assert!(engine(&bin).database_exists("test_db").unwrap());
    }

    #[test]
    fn test_psql_missing_database_means_absent() {
        let bin = TempDir::new().unwrap();
        install(
            bin.path(),
            "psql",
            "psql: error: FATAL:  database \"test_db\" does not exist",
            2,
        );
        assert!(!engine(&bin).database_exists("test_db").unwrap());
    }

    #[test]
    fn test_psql_connection_failure_is_not_absence() {
        let bin = TempDir::new().unwrap();
        install(
            bin.path(),
            "psql",
            "psql: error: FATAL:  password authentication failed for user postgres",
            2,
        );

        let err = engine(&bin).database_exists("test_db").unwrap_err();
        assert!(
            matches!(err, EngineError::Failed { status: Some(2), .. }),
            "VIOLATION: a refused connection must not read as an absent database: {:?}",
            err
        );
    }

    #[test]
    fn test_dropdb_failure_carries_stderr() {
        let bin = TempDir::new().unwrap();
        install(bin.path(), "dropdb", "dropdb: error: database is being accessed", 1);

        let err = engine(&bin).drop_database("test_db").unwrap_err();
        assert_eq!(
            err.stderr().map(str::trim),
            Some("dropdb: error: database is being accessed")
        );
    }
}
