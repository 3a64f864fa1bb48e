//! Group liveness checks.
//!
//! Every member of a group is probed on its own scoped thread; the call
//! returns once all probes have finished.

use std::process::{Command, Stdio};
use std::thread;

use serde::Serialize;
use tracing::debug;

use crate::core::registry::{GroupStore, Membership};
use crate::error::{RegistryError, Result};

/// Reachability test for one address.
pub trait Prober: Sync {
    fn probe(&self, ip: &str) -> bool;
}

/// ICMP echo through the system `ping`.
#[derive(Debug, Clone)]
pub struct Ping {
    timeout: u32,
}

impl Ping {
    pub fn new(timeout: u32) -> Self {
        Self { timeout }
    }
}

impl Prober for Ping {
    fn probe(&self, ip: &str) -> bool {
        let status = Command::new("ping")
            .args(["-c", "1", "-W"])
            .arg(self.timeout.to_string())
            .arg(ip)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(s) => s.success(),
            Err(e) => {
                debug!(ip, error = %e, "failed to run ping");
                false
            }
        }
    }
}

/// Probe result for one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Liveness {
    pub ip: String,
    pub serial: String,
    pub online: bool,
}

/// Probe every member of `group` concurrently.
///
/// Results come back in completion order.
///
/// # Errors
///
/// Returns `RegistryError::GroupNotFound` if the group has no marker.
pub fn check_group<S, P>(store: &S, group: &str, prober: &P) -> Result<Vec<Liveness>>
where
    S: GroupStore,
    P: Prober + ?Sized,
{
    if !store.group_exists(group)? {
        return Err(RegistryError::GroupNotFound(group.to_string()).into());
    }

    let members = store.members(group)?;
    Ok(probe_all(&members, prober))
}

fn probe_all<P: Prober + ?Sized>(members: &[Membership], prober: &P) -> Vec<Liveness> {
    let (tx, rx) = std::sync::mpsc::channel();

    thread::scope(|scope| {
        for member in members {
            let tx = tx.clone();
            scope.spawn(move || {
                let online = prober.probe(&member.ip);
                debug!(ip = %member.ip, online, "probe finished");
                // The receiver outlives the scope.
                let _ = tx.send(Liveness {
                    ip: member.ip.clone(),
                    serial: member.serial.clone(),
                    online,
                });
            });
        }
    });
    drop(tx);

    rx.into_iter().collect()
}
