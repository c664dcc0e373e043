// src/system/ssh.rs

use crate::CancellationToken;
use crate::constants::SSH_CONNECT_TIMEOUT_SECS;
use crate::system::executor::{self, ExecutionError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Remote command on '{member}' did not answer within {secs} seconds.")]
    Timeout { member: String, secs: u64 },
    #[error("Remote command on '{member}' exited with status {status}: {detail}")]
    CommandFailed {
        member: String,
        status: i32,
        detail: String,
    },
    #[error("The ssh transport failed for '{member}'.")]
    Transport {
        member: String,
        #[source]
        source: ExecutionError,
    },
    #[error("Operation was cancelled by the user.")]
    Cancelled,
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Everything needed to reach one cluster member over ssh.
///
/// Sessions are cheap to clone so the fan-out dispatcher can hand one to each
/// worker in its pool.
#[derive(Debug, Clone)]
pub struct RemoteSession {
    user: String,
    host: String,
    key_paths: Vec<PathBuf>,
    timeout: Duration,
    workdir: PathBuf,
}

impl RemoteSession {
    pub fn new(
        user: impl Into<String>,
        host: impl Into<String>,
        key_paths: Vec<PathBuf>,
        timeout: Duration,
        workdir: PathBuf,
    ) -> Self {
        Self {
            user: user.into(),
            host: host.into(),
            key_paths,
            timeout,
            workdir,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Runs `command` on the remote host and returns its stdout.
    ///
    /// A child that outlives the session timeout is killed and reported as
    /// [`RemoteError::Timeout`]; a nonzero remote exit becomes
    /// [`RemoteError::CommandFailed`] carrying the trimmed stderr.
    pub fn run(&self, command: &str, cancellation_token: &CancellationToken) -> RemoteResult<String> {
        let argv = self.ssh_argv(command);
        self.finish(argv, cancellation_token)
    }

    /// Copies a local file to `remote_path` on the member via scp.
    pub fn upload(
        &self,
        local: &Path,
        remote_path: &str,
        cancellation_token: &CancellationToken,
    ) -> RemoteResult<()> {
        let argv = self.scp_argv(local, remote_path);
        self.finish(argv, cancellation_token)?;
        Ok(())
    }

    fn finish(
        &self,
        argv: Vec<String>,
        cancellation_token: &CancellationToken,
    ) -> RemoteResult<String> {
        let captured =
            executor::run_capture_deadline(&argv, &self.workdir, self.timeout, cancellation_token)
                .map_err(|e| match e {
                    ExecutionError::DeadlineExceeded { .. } => RemoteError::Timeout {
                        member: self.host.clone(),
                        secs: self.timeout.as_secs(),
                    },
                    ExecutionError::Cancelled => RemoteError::Cancelled,
                    other => RemoteError::Transport {
                        member: self.host.clone(),
                        source: other,
                    },
                })?;

        if !captured.status.success() {
            return Err(RemoteError::CommandFailed {
                member: self.host.clone(),
                status: captured.status.code().unwrap_or(-1),
                detail: captured.stderr.trim().to_string(),
            });
        }
        Ok(captured.stdout)
    }

    fn ssh_argv(&self, command: &str) -> Vec<String> {
        let mut argv = vec!["ssh".to_string()];
        argv.extend(self.common_options());
        argv.push(format!("{}@{}", self.user, self.host));
        argv.push(command.to_string());
        argv
    }

    fn scp_argv(&self, local: &Path, remote_path: &str) -> Vec<String> {
        let mut argv = vec!["scp".to_string()];
        argv.extend(self.common_options());
        argv.push(local.display().to_string());
        argv.push(format!("{}@{}:{}", self.user, self.host, remote_path));
        argv
    }

    /// Batch-mode options plus an `-i` per key that actually exists on disk.
    /// Missing keys are skipped so a cluster provisioned with only the
    /// insecure Vagrant key still connects.
    fn common_options(&self) -> Vec<String> {
        let mut options = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={SSH_CONNECT_TIMEOUT_SECS}"),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
        ];
        for key in self.key_paths.iter().filter(|p| p.is_file()) {
            options.push("-i".to_string());
            options.push(key.display().to_string());
        }
        options
    }
}

/// Offers each existing key to the running ssh agent. Failures are logged and
/// ignored; the per-connection `-i` flags cover the agentless case.
pub fn offer_keys_to_agent(
    key_paths: &[PathBuf],
    workdir: &Path,
    cancellation_token: &CancellationToken,
) {
    for key in key_paths.iter().filter(|p| p.is_file()) {
        let command_line = format!("ssh-add {}", key.display());
        if let Err(e) = executor::run_capture(&command_line, workdir, cancellation_token) {
            log::debug!("ssh-add for {} failed: {}", key.display(), e);
        }
    }
}
