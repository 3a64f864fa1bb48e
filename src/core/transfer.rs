//! Verified uploads.
//!
//! Every upload follows the same protocol: hash the local file, copy it,
//! hash the remote copy, and only act on the file once both digests agree.
//!
//! ```text
//! Uploading -> Hashing -> Installing -> Done | Partial | Failed
//!                      \-> Rejected (digest mismatch, nothing activated)
//! ```
//!
//! Configuration files are then activated under a profile with `restore`,
//! user modules are extracted into the module directory, and plain files are
//! done as soon as the digests match.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::core::config::{Layout, RemoteSettings};
use crate::core::constants::UNIQUE_CONFIG_SENTINEL;
use crate::core::device::Router;
use crate::core::digest::{self, Digest, LocalFileHasher, Sha256File};
use crate::core::outcome::{Outcome, Status};
use crate::core::remote::{FileTransfer, Remote, RemoteCommand, RemoteExecutor};
use crate::core::validation;
use crate::error::{Error, Result, TransferError, ValidationError};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Configuration profile a file is restored into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    Standard,
    Alt1,
    Alt2,
    Alt3,
}

impl Profile {
    pub const ALL: [Profile; 4] = [Profile::Standard, Profile::Alt1, Profile::Alt2, Profile::Alt3];

    pub fn name(self) -> &'static str {
        match self {
            Profile::Standard => "standard",
            Profile::Alt1 => "alt1",
            Profile::Alt2 => "alt2",
            Profile::Alt3 => "alt3",
        }
    }

    /// Value written to `PROFILE=`; the standard profile is empty.
    pub fn value(self) -> &'static str {
        match self {
            Profile::Standard => "",
            other => other.name(),
        }
    }
}

impl FromStr for Profile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Profile::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| TransferError::InvalidProfile(s.to_string()).into())
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which configuration file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Path(PathBuf),
    /// The device's own `fleetssh_<serial>.cfg`.
    Unique,
}

impl ConfigSource {
    /// `$unique` selects the per-device file; anything else is a path.
    pub fn parse(arg: &str) -> Self {
        if arg.trim() == UNIQUE_CONFIG_SENTINEL {
            ConfigSource::Unique
        } else {
            ConfigSource::Path(PathBuf::from(arg.trim()))
        }
    }
}

/// Upload progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Uploading,
    Hashing,
    Installing,
    Rejected,
    Done,
    Partial,
    Failed,
}

impl Stage {
    fn is_terminal(self) -> bool {
        matches!(self, Stage::Rejected | Stage::Done | Stage::Partial | Stage::Failed)
    }
}

/// One file moving through the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    pub local: PathBuf,
    pub remote: String,
    pub local_digest: Option<Digest>,
    pub remote_digest: Option<Digest>,
    /// Stages entered so far, in order.
    pub stages: Vec<Stage>,
}

impl TransferJob {
    fn new(local: &Path, remote: String) -> Self {
        Self {
            local: local.to_path_buf(),
            remote,
            local_digest: None,
            remote_digest: None,
            stages: Vec::new(),
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug!(local = %self.local.display(), remote = %self.remote, ?stage, "transfer stage");
        self.stages.push(stage);
    }

    /// Current stage.
    pub fn stage(&self) -> Option<Stage> {
        self.stages.last().copied()
    }

    pub fn is_finished(&self) -> bool {
        self.stage().is_some_and(Stage::is_terminal)
    }
}

/// Final state of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub job: TransferJob,
    pub outcome: Outcome,
}

impl TransferReport {
    fn finish(mut job: TransferJob, outcome: Outcome) -> Self {
        job.enter(match outcome.status {
            Status::Success => Stage::Done,
            Status::PartialSuccess => Stage::Partial,
            Status::Failure => Stage::Failed,
        });
        Self { job, outcome }
    }
}

impl From<TransferReport> for Outcome {
    fn from(report: TransferReport) -> Self {
        report.outcome
    }
}

fn basename(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| TransferError::LocalFileMissing(path.to_path_buf()).into())
}

fn join_remote(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

/// Remote path for a plain upload.
///
/// A destination whose last component differs from the file name is taken
/// to be a directory and gets the file name appended.
pub fn plain_destination(file_name: &str, dest: &str) -> String {
    let last = dest.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
    if last == file_name && !dest.ends_with('/') {
        dest.to_string()
    } else {
        join_remote(dest, file_name)
    }
}

/// First path component of an archive listing line (`./name/etc/x` -> `name`).
fn module_name(listing_line: &str) -> Option<&str> {
    listing_line
        .trim()
        .trim_start_matches("./")
        .split('/')
        .find(|c| !c.is_empty())
}

/// Describe what a file starts with when it isn't gzip.
fn sniff_gzip(path: &Path) -> Result<()> {
    let mut magic = [0u8; 2];
    let mut file = File::open(path)?;
    let read = file.read(&mut magic)?;

    if read == 2 && magic == GZIP_MAGIC {
        return Ok(());
    }

    let found = if read == 0 {
        "empty file".to_string()
    } else {
        format!("starts with {:02x?}", &magic[..read])
    };
    Err(TransferError::InvalidFormat {
        path: path.to_path_buf(),
        found,
    }
    .into())
}

/// Runs verified uploads against one device.
pub struct VerifiedTransfer<'a, R: ?Sized> {
    remote: &'a R,
    hasher: Box<dyn LocalFileHasher>,
    settings: RemoteSettings,
    layout: Layout,
}

impl<'a, R: Remote + ?Sized> VerifiedTransfer<'a, R> {
    pub fn new(remote: &'a R, settings: &RemoteSettings, layout: &Layout) -> Self {
        Self {
            remote,
            hasher: Box::new(Sha256File),
            settings: settings.clone(),
            layout: layout.clone(),
        }
    }

    pub fn with_hasher(mut self, hasher: Box<dyn LocalFileHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    fn staged(&self, name: &str) -> String {
        join_remote(&self.settings.staging_dir, name)
    }

    fn run(&self, command: RemoteCommand) -> Result<bool> {
        let output = self.remote.execute(&command)?;
        debug!(command = %command, status = output.status, "remote command");
        Ok(output.success())
    }

    /// Copy and verify. Returns the job in `Hashing` with both digests equal.
    fn send(&self, local: &Path, remote: String) -> Result<TransferJob> {
        let mut job = TransferJob::new(local, remote);

        let local_digest = self.hasher.digest(local)?;
        job.local_digest = Some(local_digest.clone());

        job.enter(Stage::Uploading);
        FileTransfer::put(self.remote, local, &job.remote)?;

        job.enter(Stage::Hashing);
        let remote_digest = digest::remote_digest(self.remote, &job.remote)?;
        job.remote_digest = Some(remote_digest.clone());

        if remote_digest != local_digest {
            job.enter(Stage::Rejected);
            warn!(
                remote = %job.remote,
                local = %local_digest,
                found = %remote_digest,
                "integrity check failed"
            );
            return Err(TransferError::IntegrityMismatch {
                path: local.to_path_buf(),
                local: local_digest.to_string(),
                remote: remote_digest.to_string(),
            }
            .into());
        }

        Ok(job)
    }

    /// Upload a configuration file and restore it into `profile`.
    ///
    /// # Errors
    ///
    /// `MissingUniqueConfig` / `LocalFileMissing` before anything is sent,
    /// `TransferFailed` or `IntegrityMismatch` without activation,
    /// `ActivationFailed` if the profile edit or `restore` fails.
    pub fn upload_config(&self, source: &ConfigSource, profile: Profile) -> Result<TransferReport> {
        let local = match source {
            ConfigSource::Path(path) => {
                if !path.is_file() {
                    return Err(TransferError::LocalFileMissing(path.clone()).into());
                }
                path.clone()
            }
            ConfigSource::Unique => {
                let serial = Router::new(self.remote, &self.settings).serial()?;
                let path = self.layout.unique_config(&serial);
                if !path.is_file() {
                    return Err(TransferError::MissingUniqueConfig(path).into());
                }
                path
            }
        };

        let name = basename(&local)?;
        let mut job = self.send(&local, self.staged(&name))?;
        job.enter(Stage::Installing);

        let directive = format!("PROFILE={}", profile.value());
        let has_profile = self.run(
            RemoteCommand::new("grep")
                .arg("-q")
                .arg("^PROFILE=")
                .arg(job.remote.as_str()),
        )?;
        let edit = if has_profile {
            RemoteCommand::new("sed")
                .arg("-i")
                .arg(format!("s/^PROFILE=.*/{}/", directive))
                .arg(job.remote.as_str())
        } else if self.run(RemoteCommand::new("test").arg("-s").arg(job.remote.as_str()))? {
            RemoteCommand::new("sed")
                .arg("-i")
                .arg(format!("1i\\{}", directive))
                .arg(job.remote.as_str())
        } else {
            // sed has no first line to insert before in an empty file.
            RemoteCommand::print(directive.as_str()).write_to(job.remote.as_str())
        };

        let applied = self.run(edit)?
            && self.run(
                RemoteCommand::new("grep")
                    .arg("-qxF")
                    .arg(directive.as_str())
                    .arg(job.remote.as_str()),
            )?;
        if !applied {
            return Err(TransferError::ActivationFailed(format!(
                "couldn't activate profile '{}', configuration failed",
                profile
            ))
            .into());
        }

        let restored = self.run(RemoteCommand::new("restore").arg(job.remote.as_str()))?;
        if !self.run(RemoteCommand::new("rm").arg("-f").arg(job.remote.as_str()))? {
            warn!(remote = %job.remote, "failed to remove uploaded configuration");
        }

        if !restored {
            return Err(TransferError::ActivationFailed(format!(
                "failed to restore configuration file '{}' to {}",
                name, profile
            ))
            .into());
        }

        info!(file = %name, %profile, "configuration uploaded");
        Ok(TransferReport::finish(
            job,
            Outcome::success(format!(
                "Configuration file {} uploaded to {}",
                name, profile
            )),
        ))
    }

    /// Upload and install a gzip-compressed user module.
    ///
    /// # Errors
    ///
    /// `LocalFileMissing` / `InvalidFormat` before anything is sent,
    /// `TransferFailed` or `IntegrityMismatch` without installing.
    /// Listing or extraction failure is a `Partial` report, not an error.
    pub fn upload_module(&self, path: &Path) -> Result<TransferReport> {
        if !path.is_file() {
            return Err(TransferError::LocalFileMissing(path.to_path_buf()).into());
        }
        sniff_gzip(path)?;

        let archive = basename(path)?;
        let mut job = self.send(path, self.staged(&archive))?;
        job.enter(Stage::Installing);

        let listing = self
            .remote
            .execute(&RemoteCommand::new("tar").arg("-tzf").arg(job.remote.as_str()))?;
        let name = match listing.first_line().and_then(module_name) {
            Some(name) if listing.success() && validation::validate_module_name(name).is_ok() => {
                name.to_string()
            }
            _ => {
                return Ok(TransferReport::finish(
                    job,
                    Outcome::partial(format!(
                        "User module {} transferred to router, but its contents couldn't be listed",
                        archive
                    )),
                ))
            }
        };

        let module_dir = self.settings.module_dir.trim_end_matches('/');
        if !self.run(
            RemoteCommand::new("tar")
                .arg("-xzf")
                .arg(job.remote.as_str())
                .arg("-C")
                .arg(format!("{}/", module_dir)),
        )? {
            return Ok(TransferReport::finish(
                job,
                Outcome::partial(format!(
                    "User module {} transferred to router, but failed to install",
                    name
                )),
            ));
        }

        let etc = format!("{}/{}/etc", module_dir, name);
        if !self.run(
            RemoteCommand::new("cp")
                .arg(format!("{}/defaults", etc))
                .arg(format!("{}/settings", etc)),
        )? {
            warn!(module = %name, "module has no default settings to copy");
        }
        if !self.run(RemoteCommand::new("rm").arg("-f").arg(job.remote.as_str()))? {
            warn!(remote = %job.remote, "failed to remove uploaded archive");
        }

        info!(module = %name, "user module installed");
        Ok(TransferReport::finish(
            job,
            Outcome::success(format!(
                "User module {} successfully installed to router",
                name
            )),
        ))
    }

    /// Upload any file; `dest` is a remote file path or directory.
    ///
    /// # Errors
    ///
    /// `LocalFileMissing` before anything is sent, `TransferFailed` or
    /// `IntegrityMismatch` afterwards.
    pub fn upload_file(&self, local: &Path, dest: &str) -> Result<TransferReport> {
        if dest.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "destination",
            }
            .into());
        }
        if !local.is_file() {
            return Err(TransferError::LocalFileMissing(local.to_path_buf()).into());
        }

        let name = basename(local)?;
        let job = self.send(local, plain_destination(&name, dest.trim()))?;

        info!(file = %name, remote = %job.remote, "file uploaded");
        let message = format!("File '{}' successfully transferred to {}", name, job.remote);
        Ok(TransferReport::finish(job, Outcome::success(message)))
    }
}

impl<'a, R: ?Sized> fmt::Debug for VerifiedTransfer<'a, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifiedTransfer")
            .field("settings", &self.settings)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}
