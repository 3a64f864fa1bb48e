//! OpenSSH transport.
//!
//! Shells out to the `ssh` and `scp` binaries found on `PATH`. Authentication
//! uses the group's private key when one is given; the client itself prompts
//! for the key passphrase or picks it up from a running agent.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use super::{CommandOutput, FileTransfer, RemoteCommand, RemoteExecutor};
use crate::core::config::SshSettings;
use crate::error::{RemoteError, Result, TransferError};

/// Exit status `ssh` reserves for its own errors (connection, authentication).
pub const SSH_FAILURE_STATUS: i32 = 255;

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub user: String,
    pub port: u16,
    pub connect_timeout: u32,
    /// Private key passed with `-i`.
    pub identity: Option<PathBuf>,
}

impl Target {
    pub fn new(host: impl Into<String>, ssh: &SshSettings) -> Self {
        Self {
            host: host.into(),
            user: ssh.user.clone(),
            port: ssh.port,
            connect_timeout: ssh.connect_timeout,
            identity: None,
        }
    }

    pub fn with_identity(mut self, key: impl Into<PathBuf>) -> Self {
        self.identity = Some(key.into());
        self
    }

    /// `user@host`
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Options shared by `ssh` and `scp`; the port flag differs between them.
    fn base_args(&self, port_flag: &str) -> Vec<String> {
        let mut args = vec![
            port_flag.to_string(),
            self.port.to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout),
        ];
        if let Some(ref key) = self.identity {
            args.push("-i".to_string());
            args.push(key.display().to_string());
        }
        args
    }

    /// Arguments for `ssh`, up to and including the destination.
    pub fn ssh_args(&self) -> Vec<String> {
        let mut args = self.base_args("-p");
        args.push(self.destination());
        args
    }

    /// Arguments for `scp`, without the source and destination operands.
    pub fn scp_args(&self) -> Vec<String> {
        let mut args = self.base_args("-P");
        args.push("-q".to_string());
        args
    }
}

/// Transport over the system OpenSSH client.
#[derive(Debug, Clone)]
pub struct OpenSsh {
    target: Target,
    ssh: PathBuf,
    scp: PathBuf,
}

impl OpenSsh {
    /// Locate `ssh` and `scp` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::ClientNotFound` if either binary is missing.
    pub fn new(target: Target) -> Result<Self> {
        let ssh = which::which("ssh").map_err(|_| RemoteError::ClientNotFound("ssh"))?;
        let scp = which::which("scp").map_err(|_| RemoteError::ClientNotFound("scp"))?;
        Ok(Self { target, ssh, scp })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }
}

impl RemoteExecutor for OpenSsh {
    /// Status 255 is reported as `RemoteError::ConnectionFailed`, so a remote
    /// command exiting with 255 on its own is indistinguishable from a lost
    /// connection.
    fn execute(&self, command: &RemoteCommand) -> Result<CommandOutput> {
        let line = command.render();
        debug!(host = %self.target.host, command = %line, "ssh exec");

        let output = Command::new(&self.ssh)
            .args(self.target.ssh_args())
            .arg(&line)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| RemoteError::Spawn {
                program: "ssh".to_string(),
                source,
            })?;

        let status = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(status, "ssh exec finished");

        if status == SSH_FAILURE_STATUS {
            warn!(host = %self.target.host, "ssh connection failed");
            return Err(connection_failed(&self.target.host, &stderr).into());
        }

        if !stderr.is_empty() {
            let _ = std::io::stderr().write_all(stderr.as_bytes());
        }

        let stdout = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect();
        Ok(CommandOutput::new(status, stdout))
    }
}

/// Error for an `ssh` run that ended with its own failure status.
fn connection_failed(host: &str, stderr: &str) -> RemoteError {
    let reason = stderr
        .lines()
        .map(str::trim)
        .rev()
        .find(|l| !l.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("ssh exited with status {}", SSH_FAILURE_STATUS));
    RemoteError::ConnectionFailed {
        host: host.to_string(),
        reason,
    }
}

impl FileTransfer for OpenSsh {
    fn put(&self, local: &Path, remote: &str) -> Result<()> {
        debug!(host = %self.target.host, local = %local.display(), remote, "scp put");

        let status = Command::new(&self.scp)
            .args(self.target.scp_args())
            .arg(local)
            .arg(format!("{}:{}", self.target.destination(), remote))
            .stdin(Stdio::null())
            .status()
            .map_err(|e| TransferError::TransferFailed {
                path: local.to_path_buf(),
                reason: format!("failed to spawn scp: {}", e),
            })?;

        if !status.success() {
            return Err(TransferError::TransferFailed {
                path: local.to_path_buf(),
                reason: match status.code() {
                    Some(code) => format!("scp exited with status {}", code),
                    None => "scp was terminated by a signal".to_string(),
                },
            }
            .into());
        }

        Ok(())
    }
}
