// src/system/executor.rs

use crate::CancellationToken;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command as StdCommand, ExitStatus, Stdio};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command could not be parsed: {0}")]
    CommandParse(String),
    #[error("No command specified to run.")]
    EmptyCommand,
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
    #[error("Command '{0}' exited with a non-zero error code.")]
    NonZeroExitStatus(String),
    #[error("Command '{command}' produced output that was not valid UTF-8")]
    InvalidUtf8Output {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
    #[error("Command '{command}' did not finish within {secs} seconds.")]
    DeadlineExceeded { command: String, secs: u64 },
    #[error("Operation was cancelled by the user.")]
    Cancelled,
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Captured output of a finished child process. The exit status is returned
/// as-is; callers decide whether a nonzero status is an error.
#[derive(Debug)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// How often the wait loops poll a running child.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn split_command_line(command_line: &str) -> ExecutionResult<Vec<String>> {
    let trimmed = command_line.trim();
    if trimmed.is_empty() {
        return Err(ExecutionError::EmptyCommand);
    }
    let parts = shlex::split(trimmed)
        .ok_or_else(|| ExecutionError::CommandParse(trimmed.to_string()))?;
    if parts.is_empty() {
        return Err(ExecutionError::EmptyCommand);
    }
    Ok(parts)
}

/// Runs a command with inherited stdio and waits for it, returning an error
/// on a nonzero exit status.
pub fn run_interactive(
    command_line: &str,
    cwd: &Path,
    cancellation_token: &CancellationToken,
) -> ExecutionResult<()> {
    let status = run_interactive_status(command_line, cwd, cancellation_token)?;
    if !status.success() {
        return Err(ExecutionError::NonZeroExitStatus(
            command_line.trim().to_string(),
        ));
    }
    Ok(())
}

/// Runs a command with inherited stdio and waits for it, returning the exit
/// status. A nonzero status is not an error here; interactive flows (like the
/// ssh reconnect loop) inspect the status themselves.
pub fn run_interactive_status(
    command_line: &str,
    cwd: &Path,
    cancellation_token: &CancellationToken,
) -> ExecutionResult<ExitStatus> {
    let parts = split_command_line(command_line)?;
    let (program, args) = parts
        .split_first()
        .ok_or(ExecutionError::EmptyCommand)?;
    let clean_cwd = dunce::simplified(cwd);

    let child = StdCommand::new(program)
        .args(args)
        .current_dir(clean_cwd)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| ExecutionError::CommandFailed(command_line.trim().to_string(), e))?;

    wait_with_cancellation(child, command_line.trim(), cancellation_token)
}

/// Non-blocking wait loop so a cancellation request can kill the child.
fn wait_with_cancellation(
    mut child: Child,
    command_str: &str,
    cancellation_token: &CancellationToken,
) -> ExecutionResult<ExitStatus> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if cancellation_token.load(Ordering::SeqCst) {
                    log::debug!(
                        "Cancellation requested, killing child process (PID: {})...",
                        child.id()
                    );
                    if let Err(e) = child.kill() {
                        log::warn!("Failed to kill child process {}: {}", child.id(), e);
                    }
                    child.wait().ok();
                    return Err(ExecutionError::Cancelled);
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(ExecutionError::CommandFailed(command_str.to_string(), e));
            }
        }
    }
}

/// Executes a command and captures its standard output.
/// Stderr is passed through to the user's terminal.
/// NOTE: This operation is blocking and only checks for cancellation *before*
/// starting. It is intended for short-running local queries.
pub fn run_capture(
    command_line: &str,
    cwd: &Path,
    cancellation_token: &CancellationToken,
) -> ExecutionResult<String> {
    if cancellation_token.load(Ordering::SeqCst) {
        return Err(ExecutionError::Cancelled);
    }

    let parts = split_command_line(command_line)?;
    let (program, args) = parts
        .split_first()
        .ok_or(ExecutionError::EmptyCommand)?;
    let clean_cwd = dunce::simplified(cwd);

    let command_output = StdCommand::new(program)
        .args(args)
        .current_dir(clean_cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|e| ExecutionError::CommandFailed(command_line.trim().to_string(), e))?;

    if !command_output.status.success() {
        return Err(ExecutionError::NonZeroExitStatus(
            command_line.trim().to_string(),
        ));
    }

    String::from_utf8(command_output.stdout).map_err(|e| ExecutionError::InvalidUtf8Output {
        command: command_line.trim().to_string(),
        source: e,
    })
}

/// Runs an already-split command, capturing both output streams, and kills the
/// child if it outlives `deadline`.
///
/// The pipes are drained by reader threads while the child runs, so output
/// larger than the pipe buffer cannot wedge the wait loop.
pub fn run_capture_deadline(
    argv: &[String],
    cwd: &Path,
    deadline: Duration,
    cancellation_token: &CancellationToken,
) -> ExecutionResult<CapturedOutput> {
    let command_str = argv.join(" ");
    let (program, args) = argv.split_first().ok_or(ExecutionError::EmptyCommand)?;
    let clean_cwd = dunce::simplified(cwd);

    let mut child = StdCommand::new(program)
        .args(args)
        .current_dir(clean_cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ExecutionError::CommandFailed(command_str.clone(), e))?;

    let stdout_reader = spawn_pipe_reader(child.stdout.take());
    let stderr_reader = spawn_pipe_reader(child.stderr.take());

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if cancellation_token.load(Ordering::SeqCst) {
                    child.kill().ok();
                    child.wait().ok();
                    join_pipe_reader(stdout_reader);
                    join_pipe_reader(stderr_reader);
                    return Err(ExecutionError::Cancelled);
                }
                if started.elapsed() >= deadline {
                    log::debug!(
                        "Deadline of {:?} hit for '{}', killing child.",
                        deadline,
                        command_str
                    );
                    child.kill().ok();
                    child.wait().ok();
                    join_pipe_reader(stdout_reader);
                    join_pipe_reader(stderr_reader);
                    return Err(ExecutionError::DeadlineExceeded {
                        command: command_str,
                        secs: deadline.as_secs(),
                    });
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                child.kill().ok();
                join_pipe_reader(stdout_reader);
                join_pipe_reader(stderr_reader);
                return Err(ExecutionError::CommandFailed(command_str, e));
            }
        }
    };

    let stdout_bytes = join_pipe_reader(stdout_reader);
    let stderr_bytes = join_pipe_reader(stderr_reader);

    let stdout = String::from_utf8(stdout_bytes).map_err(|e| ExecutionError::InvalidUtf8Output {
        command: command_str,
        source: e,
    })?;
    let stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();

    Ok(CapturedOutput {
        status,
        stdout,
        stderr,
    })
}

fn spawn_pipe_reader<R>(pipe: Option<R>) -> Option<std::thread::JoinHandle<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut stream| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf).ok();
            buf
        })
    })
}

fn join_pipe_reader(handle: Option<std::thread::JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn token() -> CancellationToken {
        Arc::new(AtomicBool::new(false))
    }

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_run_capture_returns_stdout() {
        let out = run_capture("echo hello", Path::new("."), &token()).unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[test]
    fn test_run_capture_nonzero_is_error() {
        let result = run_capture("false", Path::new("."), &token());
        assert!(matches!(
            result,
            Err(ExecutionError::NonZeroExitStatus(_))
        ));
    }

    #[test]
    fn test_run_capture_cancelled_before_start() {
        let cancelled = Arc::new(AtomicBool::new(true));
        let result = run_capture("echo hello", Path::new("."), &cancelled);
        assert!(matches!(result, Err(ExecutionError::Cancelled)));
    }

    #[test]
    fn test_run_interactive_status_reports_exit_code() {
        // --- Execute ---
        let status =
            run_interactive_status("sh -c 'exit 255'", Path::new("."), &token()).unwrap();

        // --- Assert ---
        assert_eq!(status.code(), Some(255));
    }

    #[test]
    fn test_deadline_capture_collects_both_streams_and_status() {
        // --- Execute ---
        let captured = run_capture_deadline(
            &args(&["sh", "-c", "printf out; printf err >&2; exit 3"]),
            Path::new("."),
            Duration::from_secs(10),
            &token(),
        )
        .unwrap();

        // --- Assert ---
        assert_eq!(captured.status.code(), Some(3));
        assert_eq!(captured.stdout, "out");
        assert_eq!(captured.stderr, "err");
    }

    #[test]
    fn test_deadline_capture_kills_slow_child() {
        // --- Setup ---
        let started = Instant::now();

        // --- Execute ---
        let result = run_capture_deadline(
            &args(&["sh", "-c", "sleep 30"]),
            Path::new("."),
            Duration::from_secs(1),
            &token(),
        );

        // --- Assert ---
        assert!(matches!(
            result,
            Err(ExecutionError::DeadlineExceeded { .. })
        ));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_split_rejects_empty_command() {
        assert!(matches!(
            run_capture("   ", Path::new("."), &token()),
            Err(ExecutionError::EmptyCommand)
        ));
    }
}
