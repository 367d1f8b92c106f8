//! Running engine client binaries
//!
//! Output pipes are drained on helper threads so a chatty client cannot
//! block on a full pipe while its exit is being polled.
//!
//! On unix every client leads its own process group. A timeout kills the
//! whole group, so workers forked by the client (`pg_restore --jobs`) die
//! with it.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::errors::{EngineError, EngineResult};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Captured result of a finished client process
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Name used in errors and logs for a command
pub fn command_label(command: &Command) -> String {
    command.get_program().to_string_lossy().into_owned()
}

fn drain<R: Read>(source: Option<R>) -> String {
    let mut buffer = Vec::new();
    if let Some(mut source) = source {
        let _ = source.read_to_end(&mut buffer);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(unix)]
fn isolate(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate(_command: &mut Command) {}

/// Kill the child and everything in its process group
#[cfg(unix)]
fn terminate(child: &mut Child) {
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: kill(2) takes no pointers; the group was created by `isolate`
        unsafe {
            libc::kill(-pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
}

/// Run `command` to completion, killing it once `timeout` elapses.
///
/// A non-zero exit is not an error here; callers interpret the status.
pub fn run(mut command: Command, timeout: Option<Duration>) -> EngineResult<ProcessOutput> {
    let label = command_label(&command);

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    isolate(&mut command);

    let mut child = command.spawn().map_err(|e| EngineError::Spawn {
        command: label.clone(),
        detail: e.to_string(),
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_reader = thread::spawn(move || drain(stdout));
    let stderr_reader = thread::spawn(move || drain(stderr));

    let io_error = |e: std::io::Error| EngineError::Io {
        command: label.clone(),
        detail: e.to_string(),
    };

    let status = match timeout {
        None => child.wait().map_err(io_error)?,
        Some(limit) => {
            let started = Instant::now();
            loop {
                if let Some(status) = child.try_wait().map_err(io_error)? {
                    break status;
                }
                if started.elapsed() >= limit {
                    terminate(&mut child);
                    let _ = child.wait();
                    // Every writer is gone, so the readers hit EOF
                    let _ = stdout_reader.join();
                    return Err(EngineError::TimedOut {
                        command: label.clone(),
                        after: limit,
                        stderr: stderr_reader.join().unwrap_or_default(),
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    };

    Ok(ProcessOutput {
        status,
        stdout: stdout_reader.join().unwrap_or_default(),
        stderr: stderr_reader.join().unwrap_or_default(),
    })
}

/// Run `command` and turn a non-zero exit into [`EngineError::Failed`]
pub fn run_checked(command: Command, timeout: Option<Duration>) -> EngineResult<ProcessOutput> {
    let label = command_label(&command);
    let output = run(command, timeout)?;

    if output.status.success() {
        Ok(output)
    } else {
        Err(EngineError::Failed {
            command: label,
            status: output.status.code(),
            stderr: output.stderr,
        })
    }
}
