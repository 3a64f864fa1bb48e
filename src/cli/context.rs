//! Per-invocation state shared by the commands.

use std::path::PathBuf;

use tracing::debug;

use crate::cli::DeviceArgs;
use crate::core::config::{Layout, Settings};
use crate::core::keys::{KeyProvisioner, SshKeygen, TerminalPrompt};
use crate::core::registry::{FlatFileRegistry, GroupStore};
use crate::core::remote::{OpenSsh, Target};
use crate::error::{Result, ValidationError};

/// Resolved layout and settings.
pub struct Context {
    pub layout: Layout,
    pub settings: Settings,
}

impl Context {
    /// Resolve the administration root and load its settings.
    pub fn load(home: Option<PathBuf>) -> Result<Self> {
        let layout = Layout::resolve(home);
        let settings = Settings::load(layout.home())?;
        debug!(home = %layout.home().display(), "context loaded");
        Ok(Self { layout, settings })
    }

    pub fn registry(&self) -> FlatFileRegistry {
        FlatFileRegistry::new(self.layout.registry())
    }

    /// Key provisioner that prompts on the terminal.
    pub fn keys(&self) -> KeyProvisioner {
        KeyProvisioner::new(
            self.layout.key_dir(),
            Box::new(TerminalPrompt),
            Box::new(SshKeygen::default()),
        )
    }

    /// Open a transport to the device.
    ///
    /// The session uses the named group's key, or the key of the group
    /// registering the address when exactly one does. Otherwise no `-i` is
    /// passed and the ssh client's own configuration applies.
    pub fn connect(&self, device: &DeviceArgs) -> Result<OpenSsh> {
        if device.ip.trim().is_empty() {
            return Err(ValidationError::Empty { field: "ip" }.into());
        }

        let mut target = Target::new(device.ip.trim(), &self.settings.ssh);

        let group = match device.group {
            Some(ref group) => Some(group.clone()),
            None => self.group_of_ip(&device.ip)?,
        };

        if let Some(group) = group {
            let pair = self.keys().pair(&group);
            if pair.exists() {
                target = target.with_identity(pair.private);
            } else {
                debug!(group = %group, "no key pair for group, connecting without identity");
            }
        }

        OpenSsh::new(target)
    }

    fn group_of_ip(&self, ip: &str) -> Result<Option<String>> {
        let registry = self.registry();
        let mut found = Vec::new();
        for group in registry.list_groups()? {
            let group = group?;
            if registry.group_has_ip(&group, ip)? {
                found.push(group);
            }
        }

        if found.len() == 1 {
            Ok(found.pop())
        } else {
            debug!(ip, groups = found.len(), "address not in exactly one group");
            Ok(None)
        }
    }
}
