//! Group liveness command.

use crate::cli::context::Context;
use crate::cli::output;
use crate::core::outcome::Status;
use crate::core::status::{self, Ping};
use crate::error::Result;

/// Ping every member of `group`.
///
/// An unreachable member makes the run a partial success.
pub fn execute(ctx: &Context, group: &str, json: bool) -> Result<Status> {
    let prober = Ping::new(ctx.settings.status.ping_timeout);
    let mut results = status::check_group(&ctx.registry(), group, &prober)?;
    results.sort_by(|a, b| a.ip.cmp(&b.ip));

    let offline = results.iter().filter(|r| !r.online).count();
    let state = if offline == 0 {
        Status::Success
    } else {
        Status::PartialSuccess
    };

    if json {
        let result = serde_json::json!({
            "group": group,
            "members": results,
            "online": results.len() - offline,
            "offline": offline
        });
        output::data(&serde_json::to_string_pretty(&result)?);
        return Ok(state);
    }

    if results.is_empty() {
        output::dimmed(&format!("group '{}' has no members", group));
        return Ok(state);
    }

    output::section(&format!("Status of {}", group));
    for r in &results {
        let label = format!("{} ({})", r.ip, r.serial);
        if r.online {
            output::success(&format!("{} is online", label));
        } else {
            output::error(&format!("{} is unreachable", label));
        }
    }
    output::blank();
    output::kv("online", results.len() - offline);
    output::kv("offline", offline);

    Ok(state)
}
