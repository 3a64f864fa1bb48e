//! File digests.
//!
//! Both sides of a transfer are hashed with SHA-256. Locally the file is
//! streamed through `sha2`; remotely `openssl dgst -sha256 -r` prints
//! `<hex> *<path>` and the first token is taken.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest as _, Sha256};

use crate::core::remote::{RemoteCommand, RemoteExecutor};
use crate::error::{RemoteError, Result, TransferError};

/// Lowercase hex digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest(String);

impl Digest {
    /// Parse a hex digest, normalizing to lowercase.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        if hex.len() == 64 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self(hex.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hashes local files.
pub trait LocalFileHasher {
    /// # Errors
    ///
    /// Returns `TransferError::LocalFileMissing` if the file can't be opened.
    fn digest(&self, path: &Path) -> Result<Digest>;
}

/// SHA-256 over the file contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256File;

impl LocalFileHasher for Sha256File {
    fn digest(&self, path: &Path) -> Result<Digest> {
        let mut file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => TransferError::LocalFileMissing(path.to_path_buf()).into(),
            _ => crate::error::Error::Io(e),
        })?;

        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher)?;
        Ok(Digest(format!("{:x}", hasher.finalize())))
    }
}

/// SHA-256 of an in-memory buffer.
pub fn digest_bytes(bytes: &[u8]) -> Digest {
    Digest(format!("{:x}", Sha256::digest(bytes)))
}

/// Command printing the digest of a remote file.
pub fn remote_digest_command(path: &str) -> RemoteCommand {
    RemoteCommand::new("openssl")
        .args(["dgst", "-sha256", "-r"])
        .arg(path)
}

/// Extract the digest from the first output line of [`remote_digest_command`].
pub fn parse_remote_digest(line: &str) -> Option<Digest> {
    line.split_whitespace().next().and_then(Digest::from_hex)
}

/// Digest of a remote file.
///
/// # Errors
///
/// Returns `RemoteError::NoOutput` if the command failed or printed nothing,
/// `RemoteError::Unparseable` if the output has no digest.
pub fn remote_digest<R: RemoteExecutor + ?Sized>(remote: &R, path: &str) -> Result<Digest> {
    let command = remote_digest_command(path);
    let output = remote.execute(&command)?;

    let line = match output.first_line() {
        Some(line) if output.success() => line,
        _ => return Err(RemoteError::NoOutput(command.render()).into()),
    };

    parse_remote_digest(line).ok_or_else(|| {
        RemoteError::Unparseable {
            command: command.render(),
            line: line.to_string(),
        }
        .into()
    })
}
