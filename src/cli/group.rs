//! Group commands.
//!
//! List groups, show members, delete a group with its key pair.

use crate::cli::context::Context;
use crate::cli::output;
use crate::core::enroll;
use crate::core::outcome::Status;
use crate::core::registry::GroupStore;
use crate::error::{RegistryError, Result};

/// List group names in registry order.
pub fn list(ctx: &Context, json: bool) -> Result<Status> {
    let registry = ctx.registry();
    let groups = registry.list_groups()?.collect::<Result<Vec<_>>>()?;

    if json {
        let result = serde_json::json!({
            "groups": groups,
            "count": groups.len()
        });
        output::data(&serde_json::to_string_pretty(&result)?);
    } else if groups.is_empty() {
        output::dimmed("no groups registered");
    } else {
        output::blank();
        output::header(&format!("{} groups", output::count(groups.len())));
        output::rule();
        for group in &groups {
            output::list_item(group);
        }
    }

    Ok(Status::Success)
}

/// List the members of one group.
pub fn members(ctx: &Context, group: &str, json: bool) -> Result<Status> {
    let registry = ctx.registry();
    if !registry.group_exists(group)? {
        return Err(RegistryError::GroupNotFound(group.to_string()).into());
    }
    let members = registry.members(group)?;

    if json {
        let result = serde_json::json!({
            "group": group,
            "members": members,
            "count": members.len()
        });
        output::data(&serde_json::to_string_pretty(&result)?);
    } else if members.is_empty() {
        output::dimmed(&format!("group '{}' has no members", group));
    } else {
        output::blank();
        output::header(&format!(
            "{} members in {}",
            output::count(members.len()),
            group
        ));
        output::rule();
        for member in &members {
            output::kv(&member.ip, &member.serial);
        }
    }

    Ok(Status::Success)
}

/// Delete a group and its key pair.
pub fn delete(ctx: &Context, group: &str) -> Result<Status> {
    let keys = ctx.keys();
    let outcome = enroll::delete_group(&ctx.registry(), &keys, group);
    output::outcome(&outcome);
    Ok(outcome.status)
}
