//! Transport abstraction.
//!
//! Operations never talk to SSH directly. They issue [`RemoteCommand`]s
//! through a [`RemoteExecutor`] and copy files through a [`FileTransfer`];
//! [`OpenSsh`] implements both by driving the system `ssh` and `scp` binaries.
//! Tests substitute an in-memory device.

pub mod command;
pub mod openssh;

use std::path::Path;

pub use command::{quote, RemoteCommand};
pub use openssh::{OpenSsh, Target};

use crate::error::Result;

/// Result of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status; 0 is success.
    pub status: i32,
    /// Standard output split into lines.
    pub stdout: Vec<String>,
}

impl CommandOutput {
    pub fn new(status: i32, stdout: Vec<String>) -> Self {
        Self { status, stdout }
    }

    /// Successful command with the given output lines.
    pub fn ok<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(0, lines.into_iter().map(Into::into).collect())
    }

    /// Failed command without output.
    pub fn failed(status: i32) -> Self {
        Self::new(status, Vec::new())
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// First output line, used for scalar results.
    pub fn first_line(&self) -> Option<&str> {
        self.stdout.first().map(String::as_str)
    }
}

/// Runs commands on a device.
pub trait RemoteExecutor {
    /// Execute a command and wait for it.
    ///
    /// A non-zero exit status is reported in [`CommandOutput::status`], not as
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns error if the command could not be dispatched or the connection
    /// to the device failed.
    fn execute(&self, command: &RemoteCommand) -> Result<CommandOutput>;
}

/// Copies local files to a device.
pub trait FileTransfer {
    /// Copy `local` to the absolute `remote` path.
    ///
    /// # Errors
    ///
    /// Returns `TransferError::TransferFailed` if the copy did not complete.
    fn put(&self, local: &Path, remote: &str) -> Result<()>;
}

/// A device reachable for both commands and file copies.
pub trait Remote: RemoteExecutor + FileTransfer {}

impl<T: RemoteExecutor + FileTransfer + ?Sized> Remote for T {}

impl<T: RemoteExecutor + ?Sized> RemoteExecutor for &T {
    fn execute(&self, command: &RemoteCommand) -> Result<CommandOutput> {
        (**self).execute(command)
    }
}

impl<T: FileTransfer + ?Sized> FileTransfer for &T {
    fn put(&self, local: &Path, remote: &str) -> Result<()> {
        (**self).put(local, remote)
    }
}
