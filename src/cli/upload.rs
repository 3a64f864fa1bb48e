//! Verified upload commands.
//!
//! Each upload is hashed locally, copied, hashed again on the device and
//! only activated when both digests agree.

use std::path::Path;

use crate::cli::context::Context;
use crate::cli::{output, DeviceArgs};
use crate::core::outcome::Status;
use crate::core::transfer::{ConfigSource, Profile, TransferReport, VerifiedTransfer};
use crate::error::Result;

fn report(report: TransferReport) -> Status {
    output::outcome(&report.outcome);
    if let Some(ref digest) = report.job.local_digest {
        output::kv("sha256", digest);
    }
    output::kv("remote", output::path(&report.job.remote));
    report.outcome.status
}

/// Upload a configuration file and restore it into `profile`.
pub fn cfg(ctx: &Context, device: &DeviceArgs, source: &str, profile: &str) -> Result<Status> {
    let profile: Profile = profile.parse()?;
    let source = ConfigSource::parse(source);

    let remote = ctx.connect(device)?;
    let transfer = VerifiedTransfer::new(&remote, &ctx.settings.remote, &ctx.layout);
    Ok(report(transfer.upload_config(&source, profile)?))
}

/// Upload and install a user module archive.
pub fn module(ctx: &Context, device: &DeviceArgs, path: &Path) -> Result<Status> {
    let remote = ctx.connect(device)?;
    let transfer = VerifiedTransfer::new(&remote, &ctx.settings.remote, &ctx.layout);
    Ok(report(transfer.upload_module(path)?))
}

/// Upload a plain file to `dest`.
pub fn file(ctx: &Context, device: &DeviceArgs, local: &Path, dest: &str) -> Result<Status> {
    let remote = ctx.connect(device)?;
    let transfer = VerifiedTransfer::new(&remote, &ctx.settings.remote, &ctx.layout);
    Ok(report(transfer.upload_file(local, dest)?))
}
