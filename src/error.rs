//! Error types.
//!
//! Each concern gets its own enum; [`Error`] wraps them so every fallible
//! function in the crate can return [`Result`].

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Group registry errors.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("client '{serial}' is already in group '{group}'")]
    AlreadyInGroup { serial: String, group: String },

    #[error("client IP '{ip}' already belongs to group '{group}'")]
    IpConflict { ip: String, group: String },

    #[error("group '{0}' doesn't exist")]
    GroupNotFound(String),

    #[error("device '{0}' doesn't belong to any group")]
    DeviceNotFound(String),

    #[error("failed to read registry {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write registry {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Group key pair errors.
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("aborted: no keys were created")]
    Aborted,

    #[error("key generation failed: {0}")]
    GenerationFailed(String),

    #[error("ssh-keygen not found in PATH")]
    KeygenNotFound,

    #[error("no key pair for group '{0}'")]
    Missing(String),

    #[error("key pair for group '{0}' is incomplete: restore the missing half or remove both files")]
    IncompletePair(String),

    #[error("failed to read key file: {0}")]
    ReadFailed(#[source] std::io::Error),

    #[error("failed to remove group keys: {0}")]
    RemoveFailed(#[source] std::io::Error),

    #[error("password prompt failed: {0}")]
    Prompt(String),
}

/// Verified upload errors.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("file '{}' does not exist", .0.display())]
    LocalFileMissing(PathBuf),

    #[error("invalid profile '{0}' (expected standard, alt1, alt2 or alt3)")]
    InvalidProfile(String),

    #[error("missing unique configuration file '{}'", .0.display())]
    MissingUniqueConfig(PathBuf),

    #[error("invalid user module '{}' ({found}), supported format is application/gzip", .path.display())]
    InvalidFormat { path: PathBuf, found: String },

    #[error("transfer of '{}' failed: {reason}", .path.display())]
    TransferFailed { path: PathBuf, reason: String },

    #[error("'{}' was transferred but failed integrity check (local {local}, remote {remote}), not activating", .path.display())]
    IntegrityMismatch {
        path: PathBuf,
        local: String,
        remote: String,
    },

    #[error("{0}")]
    ActivationFailed(String),
}

/// Remote command errors.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} not found in PATH")]
    ClientNotFound(&'static str),

    #[error("no output from '{0}'")]
    NoOutput(String),

    #[error("unexpected output from '{command}': {line}")]
    Unparseable { command: String, line: String },

    #[error("'{command}' exited with status {status}")]
    CommandFailed { command: String, status: i32 },

    #[error("ssh connection to {host} failed: {reason}")]
    ConnectionFailed { host: String, reason: String },
}

/// Settings file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read settings: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Input validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("invalid {field} '{value}': {reason}")]
    InvalidToken {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid setting '{0}', expected PARAM=value")]
    InvalidSetting(String),

    #[error("password must be at least 8 characters from A-Za-z0-9@#$%^&+=!?-")]
    WeakPassword,

    #[error("line {line}: {reason}")]
    Script { line: usize, reason: String },
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
