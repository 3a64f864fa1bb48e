//! Group enrollment flows.
//!
//! The registry is written only once key material exists. A failed key
//! install on the device rolls the registration back.

use tracing::{info, warn};

use crate::core::device::{KeyInstall, Router};
use crate::core::keys::KeyProvisioner;
use crate::core::outcome::Outcome;
use crate::core::registry::GroupStore;
use crate::core::remote::RemoteExecutor;
use crate::error::Result;

/// Register the device at `ip` in `group` and authorize the group key on it.
///
/// Success when the key and its backup are installed, partial success when
/// only the backup failed, failure otherwise.
pub fn add_client<S, R>(
    store: &S,
    keys: &KeyProvisioner,
    router: &Router<'_, R>,
    group: &str,
    ip: &str,
) -> Outcome
where
    S: GroupStore,
    R: RemoteExecutor + ?Sized,
{
    Outcome::from_result(try_add_client(store, keys, router, group, ip))
}

fn try_add_client<S, R>(
    store: &S,
    keys: &KeyProvisioner,
    router: &Router<'_, R>,
    group: &str,
    ip: &str,
) -> Result<Outcome>
where
    S: GroupStore,
    R: RemoteExecutor + ?Sized,
{
    let serial = router.serial()?;
    store.check_join(group, ip, &serial)?;

    let provisioned = keys.ensure_group_keys(group)?;
    if provisioned.created {
        info!(group, "created keys for new group");
    }
    let public_key = provisioned.pair.public_key()?;

    let added = store.add_client(group, ip, &serial)?;

    match router.install_public_key(&public_key) {
        Ok(KeyInstall::Installed) => Ok(Outcome::success(format!(
            "Public key installed, client '{}' added to group '{}'",
            serial, group
        ))),
        Ok(KeyInstall::BackupFailed) => Ok(Outcome::partial(format!(
            "Public key installed, client '{}' added to group '{}', but failed to create backup",
            serial, group
        ))),
        Err(e) => {
            warn!(serial = %serial, group, error = %e, "key install failed, reverting registration");
            let reverted = store.remove_device(&serial).is_ok()
                && (!added.created_group() || store.delete_group(group).is_ok());
            Ok(Outcome::failure(format!(
                "Failed to install public key to router: {}{}",
                e,
                if reverted {
                    ""
                } else {
                    " (registry entry could not be reverted)"
                }
            )))
        }
    }
}

/// Delete a group and its key pair.
///
/// Failing to remove the keys after the registry update is a partial success.
pub fn delete_group<S: GroupStore>(store: &S, keys: &KeyProvisioner, group: &str) -> Outcome {
    let removed = match store.delete_group(group) {
        Ok(removed) => removed,
        Err(e) => return Outcome::from(e),
    };

    match keys.remove_group_keys(group) {
        Ok(_) => Outcome::success(format!(
            "Group '{}' deleted ({} member{})",
            group,
            removed.len(),
            if removed.len() == 1 { "" } else { "s" }
        )),
        Err(e) => {
            warn!(group, error = %e, "group deleted but keys remain");
            Outcome::partial(format!("Group '{}' deleted, but {}", group, e))
        }
    }
}

/// Remove a device from whichever group holds it.
pub fn remove_device<S: GroupStore>(store: &S, serial: &str) -> Outcome {
    match store.remove_device(serial) {
        Ok(membership) => Outcome::success(format!(
            "Client '{}' ({}) removed",
            membership.serial, membership.ip
        )),
        Err(e) => Outcome::from(e),
    }
}
