//! Script commands.
//!
//! Run a batch script against one device, or write the annotated example.

use std::path::Path;

use crate::cli::context::Context;
use crate::cli::{output, DeviceArgs};
use crate::core::batch::{self, Session};
use crate::core::outcome::{Outcome, Status};
use crate::error::Result;

/// Run every step of `script` against the device.
///
/// The script is parsed completely before the device is contacted.
pub fn run(ctx: &Context, script: &Path, device: &DeviceArgs) -> Result<Status> {
    let steps = batch::load(script)?;
    if steps.is_empty() {
        output::dimmed("script has no commands");
        return Ok(Status::Success);
    }

    let remote = ctx.connect(device)?;
    let registry = ctx.registry();
    let keys = ctx.keys();
    let session = Session {
        store: &registry,
        keys: &keys,
        remote: &remote,
        settings: &ctx.settings,
        layout: &ctx.layout,
    };

    output::section(&format!("Running {} on {}", script.display(), device.ip));
    let report = session.run(steps, |line, outcome| {
        output::outcome(&Outcome {
            message: format!("[line {}] {}: {}", line.line, line.step, outcome.message),
            status: outcome.status,
        });
    });

    output::blank();
    output::kv("steps", report.steps.len());
    output::kv("failed", report.failed());
    output::kv("status", report.status());

    Ok(report.status())
}

/// Write the example script into `dir`.
pub fn example(dir: &Path) -> Result<Status> {
    let path = batch::write_example(dir)?;
    output::success(&format!("example script written to {}", output::path(path.display())));
    output::hint(&format!(
        "run it with: {}",
        output::cmd("fleetssh run <script> --ip <address>")
    ));
    Ok(Status::Success)
}
