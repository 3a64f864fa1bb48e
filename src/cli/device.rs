//! One-shot device maintenance commands.

use crate::cli::context::Context;
use crate::cli::{output, DeviceArgs};
use crate::core::device::{Role, Router};
use crate::core::outcome::{Outcome, Status};
use crate::core::remote::OpenSsh;
use crate::error::Result;

fn with_router<F>(ctx: &Context, args: &DeviceArgs, op: F) -> Result<Status>
where
    F: FnOnce(&Router<'_, OpenSsh>) -> Outcome,
{
    let remote = ctx.connect(args)?;
    let outcome = op(&Router::new(&remote, &ctx.settings.remote));
    output::outcome(&outcome);
    Ok(outcome.status)
}

/// Print the device serial number.
pub fn serial(ctx: &Context, args: &DeviceArgs) -> Result<Status> {
    let remote = ctx.connect(args)?;
    output::data(&Router::new(&remote, &ctx.settings.remote).serial()?);
    Ok(Status::Success)
}

/// Print the device MAC address.
pub fn mac(ctx: &Context, args: &DeviceArgs) -> Result<Status> {
    let remote = ctx.connect(args)?;
    output::data(&Router::new(&remote, &ctx.settings.remote).mac()?);
    Ok(Status::Success)
}

pub fn exec(ctx: &Context, args: &DeviceArgs, script: &str) -> Result<Status> {
    with_router(ctx, args, |r| r.run_command(script))
}

pub fn sws(ctx: &Context, args: &DeviceArgs, setting: &str) -> Result<Status> {
    with_router(ctx, args, |r| r.set_setting(setting))
}

pub fn create_user(
    ctx: &Context,
    args: &DeviceArgs,
    name: &str,
    password: &str,
    role: &str,
) -> Result<Status> {
    let role: Role = role.parse()?;
    with_router(ctx, args, |r| r.create_user(name, password, role))
}

pub fn delete_user(ctx: &Context, args: &DeviceArgs, name: &str) -> Result<Status> {
    with_router(ctx, args, |r| r.delete_user(name))
}

pub fn change_password(ctx: &Context, args: &DeviceArgs, name: &str, password: &str) -> Result<Status> {
    with_router(ctx, args, |r| r.change_password(name, password))
}

pub fn remove_module(ctx: &Context, args: &DeviceArgs, name: &str) -> Result<Status> {
    with_router(ctx, args, |r| r.remove_module(name))
}

pub fn update_name(ctx: &Context, args: &DeviceArgs, stamp: &str) -> Result<Status> {
    with_router(ctx, args, |r| r.update_name(stamp))
}

pub fn latest_update(ctx: &Context, args: &DeviceArgs) -> Result<Status> {
    with_router(ctx, args, |r| r.latest_update())
}

pub fn reboot(ctx: &Context, args: &DeviceArgs) -> Result<Status> {
    with_router(ctx, args, |r| r.reboot())
}
