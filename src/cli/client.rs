//! Enrollment commands.

use crate::cli::context::Context;
use crate::cli::{output, DeviceArgs};
use crate::core::device::Router;
use crate::core::enroll;
use crate::core::outcome::Status;
use crate::core::validation;
use crate::error::Result;

/// Add the device at `ip` to `group`.
pub fn add(ctx: &Context, group: &str, ip: &str) -> Result<Status> {
    validation::validate_group(group)?;
    validation::validate_ip(ip)?;

    let remote = ctx.connect(&DeviceArgs {
        ip: ip.to_string(),
        group: Some(group.to_string()),
    })?;
    let router = Router::new(&remote, &ctx.settings.remote);

    let outcome = enroll::add_client(&ctx.registry(), &ctx.keys(), &router, group, ip);
    output::outcome(&outcome);
    Ok(outcome.status)
}

/// Remove a device from its group by serial number.
pub fn remove(ctx: &Context, serial: &str) -> Result<Status> {
    validation::validate_serial(serial)?;

    let outcome = enroll::remove_device(&ctx.registry(), serial);
    output::outcome(&outcome);
    Ok(outcome.status)
}
