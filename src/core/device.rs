//! Device maintenance operations.
//!
//! [`Router`] wraps a [`RemoteExecutor`] and turns each maintenance task into
//! a short sequence of typed remote commands. Every task returns an
//! [`Outcome`]; only the lookups used by other flows (`serial`, `mac`,
//! `install_public_key`) return `Result`.

use std::str::FromStr;

use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::core::config::RemoteSettings;
use crate::core::constants::{
    REMOTE_AUTHORIZED_KEYS, REMOTE_RC_LOCAL, REMOTE_SSH_DIR, REMOTE_STAMP_DIR, REMOTE_STAMP_FILE,
};
use crate::core::outcome::Outcome;
use crate::core::remote::{CommandOutput, RemoteCommand, RemoteExecutor};
use crate::core::types::{PublicKey, Serial};
use crate::core::validation;
use crate::error::{Error, RemoteError, Result, ValidationError};

/// Kind of account created by [`Router::create_user`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Member of the `root` group.
    Admin,
    Regular,
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "admin" => Ok(Role::Admin),
            "regular" | "user" => Ok(Role::Regular),
            other => Err(ValidationError::InvalidToken {
                field: "role",
                value: other.to_string(),
                reason: "expected admin or regular".to_string(),
            }
            .into()),
        }
    }
}

/// Result of a successful public key install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInstall {
    /// Key, backup and boot hook are all in place.
    Installed,
    /// The key works now but will not survive a firmware reset.
    BackupFailed,
}

/// Replace `$date` with today's date as `dd/mm/YYYY`.
pub fn expand_stamp(stamp: &str, today: NaiveDate) -> String {
    stamp.replace("$date", &today.format("%d/%m/%Y").to_string())
}

/// Field `index` of the first line containing `label`.
fn field_of<'a>(lines: &'a [String], label: &str, index: usize) -> Option<&'a str> {
    lines
        .iter()
        .find(|l| l.contains(label))
        .and_then(|l| l.split_whitespace().nth(index))
}

/// Escape a replacement for `sed s|..|..|`.
fn sed_replacement(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '|' | '&') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Maintenance operations on one device.
pub struct Router<'a, R: ?Sized> {
    remote: &'a R,
    module_dir: String,
}

impl<'a, R: RemoteExecutor + ?Sized> Router<'a, R> {
    pub fn new(remote: &'a R, settings: &RemoteSettings) -> Self {
        Self {
            remote,
            module_dir: settings.module_dir.trim_end_matches('/').to_string(),
        }
    }

    fn run(&self, command: RemoteCommand) -> Result<CommandOutput> {
        let output = self.remote.execute(&command)?;
        debug!(command = %command, status = output.status, "remote command");
        Ok(output)
    }

    /// Run and require exit status 0.
    fn run_ok(&self, command: RemoteCommand) -> Result<CommandOutput> {
        let rendered = command.render();
        let output = self.run(command)?;
        if !output.success() {
            return Err(RemoteError::CommandFailed {
                command: rendered,
                status: output.status,
            }
            .into());
        }
        Ok(output)
    }

    fn status_of(&self, command: RemoteCommand) -> Result<bool> {
        Ok(self.run(command)?.success())
    }

    fn lookup(&self, command: RemoteCommand, label: &str, index: usize) -> Result<String> {
        let rendered = command.render();
        let output = self.run(command)?;
        if output.stdout.is_empty() {
            return Err(RemoteError::NoOutput(rendered).into());
        }
        field_of(&output.stdout, label, index)
            .map(str::to_string)
            .ok_or_else(|| {
                RemoteError::Unparseable {
                    command: rendered,
                    line: format!("no '{}' line", label),
                }
                .into()
            })
    }

    /// Device serial number (4th field of the `Serial Number` line).
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the device doesn't report one.
    pub fn serial(&self) -> Result<Serial> {
        self.lookup(
            RemoteCommand::new("status").args(["-v", "sys"]),
            "Serial Number",
            3,
        )
    }

    /// Primary MAC address (5th field of the `HWaddr` line of `eth0`).
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the interface has no hardware address.
    pub fn mac(&self) -> Result<String> {
        self.lookup(RemoteCommand::new("ifconfig").arg("eth0"), "HWaddr", 4)
    }

    /// Resolve a whole-value `$serial` or `$mac` placeholder.
    fn resolve_value(&self, value: &str) -> Result<String> {
        match value {
            "$serial" => self.serial(),
            "$mac" => self.mac(),
            other => Ok(other.to_string()),
        }
    }

    /// Replace `($serial)` and `($mac)` inside a password.
    fn resolve_password(&self, password: &str) -> Result<String> {
        let mut out = password.to_string();
        if out.contains("($serial)") {
            out = out.replace("($serial)", &self.serial()?);
        }
        if out.contains("($mac)") {
            out = out.replace("($mac)", &self.mac()?);
        }
        Ok(out)
    }

    /// Write an update stamp; `$date` expands to today.
    pub fn update_name(&self, stamp: &str) -> Outcome {
        let stamp = expand_stamp(stamp, Local::now().date_naive());
        let result = self
            .run_ok(RemoteCommand::new("mkdir").arg("-p").arg(REMOTE_STAMP_DIR))
            .and_then(|_| {
                self.run_ok(RemoteCommand::print(stamp.as_str()).write_to(REMOTE_STAMP_FILE))
            });

        match result {
            Ok(_) => {
                info!(stamp = %stamp, "update stamp written");
                Outcome::success(format!("Update name: {}", stamp))
            }
            Err(e) => Outcome::failure(format!("Failed to create update-stamp: {}", e)),
        }
    }

    /// Read the update stamp.
    pub fn latest_update(&self) -> Outcome {
        match self.run(RemoteCommand::new("cat").arg(REMOTE_STAMP_FILE)) {
            Ok(out) if out.success() => match out.first_line() {
                Some(line) if !line.trim().is_empty() => {
                    Outcome::success(format!("Latest update: {}", line.trim()))
                }
                _ => Outcome::partial("No prior updates found"),
            },
            Ok(_) => Outcome::partial("No prior updates found"),
            Err(e) => Outcome::from(e),
        }
    }

    /// Run operator-supplied shell text verbatim.
    pub fn run_command(&self, script: &str) -> Outcome {
        if script.trim().is_empty() {
            return Outcome::from(Error::from(ValidationError::Empty { field: "command" }));
        }

        match self.run(RemoteCommand::operator(script)) {
            Ok(out) if out.success() => {
                Outcome::success(format!("Command '{}' ran successfully", script))
            }
            Ok(out) => Outcome::failure(format!(
                "Command '{}' returned exit status {}",
                script, out.status
            )),
            Err(e) => Outcome::from(e),
        }
    }

    /// Change one `PARAM=value` pair in the `/etc/settings.*` file holding it.
    ///
    /// A value of `$serial` or `$mac` is replaced with the device's own.
    pub fn set_setting(&self, setting: &str) -> Outcome {
        Outcome::from_result(self.try_set_setting(setting))
    }

    fn try_set_setting(&self, setting: &str) -> Result<Outcome> {
        let (param, value) = validation::parse_setting(setting)?;
        let anchored = format!("^{}=", param);

        let found = self.run(
            RemoteCommand::new("grep")
                .arg("-l")
                .arg(anchored.as_str())
                .literal("/etc/settings.*"),
        )?;
        let file = match found.first_line().map(str::trim) {
            Some(file) if !file.is_empty() => file.to_string(),
            _ => return Ok(Outcome::failure(format!("Invalid parameter '{}='", param))),
        };

        let value = self.resolve_value(value)?;
        let expression = format!("s|{}.*|{}={}|", anchored, param, sed_replacement(&value));

        if self.status_of(RemoteCommand::new("sed").arg("-i").arg(expression).arg(file.as_str()))? {
            info!(param, file = %file, "setting changed");
            Ok(Outcome::success(format!(
                "Parameter '{}=' successfully changed to '{}'",
                param, value
            )))
        } else {
            Ok(Outcome::failure(format!(
                "Failed to change parameter '{}=' to '{}'",
                param, value
            )))
        }
    }

    fn user_exists(&self, name: &str) -> Result<bool> {
        self.status_of(RemoteCommand::new("id").arg("-u").arg(name))
    }

    fn set_password(&self, name: &str, password: &str) -> Result<bool> {
        self.status_of(
            RemoteCommand::print(format!("{}:{}", name, password))
                .pipe(RemoteCommand::new("chpasswd").arg("-m")),
        )
    }

    /// Create a user and set its password.
    ///
    /// `($serial)` and `($mac)` inside the password are replaced with the
    /// device's values.
    pub fn create_user(&self, name: &str, password: &str, role: Role) -> Outcome {
        Outcome::from_result(self.try_create_user(name, password, role))
    }

    fn try_create_user(&self, name: &str, password: &str, role: Role) -> Result<Outcome> {
        validation::validate_serial(name).map_err(|_| ValidationError::InvalidToken {
            field: "user",
            value: name.to_string(),
            reason: "must be a single word".to_string(),
        })?;
        let password = self.resolve_password(password)?;

        if self.user_exists(name)? {
            return Ok(Outcome::partial(format!("User '{}' already exists", name)));
        }

        let add = match role {
            Role::Admin => RemoteCommand::new("adduser")
                .args(["-D", "-S"])
                .arg(name)
                .args(["-G", "root"]),
            Role::Regular => RemoteCommand::new("adduser").arg("-D").arg(name).arg(name),
        };
        if !self.status_of(add)? {
            return Ok(Outcome::failure(format!("Couldn't create new user '{}'", name)));
        }

        if self.set_password(name, &password)? {
            info!(user = name, ?role, "user created");
            Ok(Outcome::success(format!("New user '{}' created", name)))
        } else {
            warn!(user = name, "user created without password");
            Ok(Outcome::partial(format!(
                "New user '{}' was created, but password remains blank",
                name
            )))
        }
    }

    /// Delete a user.
    pub fn delete_user(&self, name: &str) -> Outcome {
        Outcome::from_result(self.try_delete_user(name))
    }

    fn try_delete_user(&self, name: &str) -> Result<Outcome> {
        if !self.user_exists(name)? {
            return Ok(Outcome::partial(format!("User '{}' doesn't exist", name)));
        }

        if self.status_of(RemoteCommand::new("deluser").arg(name))? {
            info!(user = name, "user deleted");
            Ok(Outcome::success(format!("User '{}' deleted", name)))
        } else {
            Ok(Outcome::failure(format!("Failed to delete user '{}'", name)))
        }
    }

    /// Change a user's password, with the same substitutions as `create_user`.
    pub fn change_password(&self, name: &str, password: &str) -> Outcome {
        Outcome::from_result(self.try_change_password(name, password))
    }

    fn try_change_password(&self, name: &str, password: &str) -> Result<Outcome> {
        let password = self.resolve_password(password)?;

        if !self.user_exists(name)? {
            return Ok(Outcome::partial(format!(
                "Can't change password, user '{}' does not exist",
                name
            )));
        }

        if self.set_password(name, &password)? {
            info!(user = name, "password changed");
            Ok(Outcome::success(format!(
                "Password for user '{}' successfully changed",
                name
            )))
        } else {
            Ok(Outcome::failure(format!(
                "Failed to change password for user '{}'",
                name
            )))
        }
    }

    /// Remove an installed user module.
    pub fn remove_module(&self, name: &str) -> Outcome {
        Outcome::from_result(self.try_remove_module(name))
    }

    fn try_remove_module(&self, name: &str) -> Result<Outcome> {
        validation::validate_module_name(name)?;
        let path = format!("{}/{}", self.module_dir, name);

        if !self.status_of(RemoteCommand::new("ls").arg(path.as_str()))? {
            return Ok(Outcome::failure(format!(
                "User module '{}' doesn't exist",
                name
            )));
        }

        if self.status_of(RemoteCommand::new("rm").arg("-rf").arg(path.as_str()))? {
            info!(module = name, "user module removed");
            Ok(Outcome::success(format!(
                "User module '{}' successfully removed from router",
                name
            )))
        } else {
            Ok(Outcome::failure(format!(
                "Failed to remove user module '{}'",
                name
            )))
        }
    }

    /// Reboot the device. The exit status is not inspected; transport errors
    /// are still reported as failures.
    pub fn reboot(&self) -> Outcome {
        match self.run(RemoteCommand::new("reboot")) {
            Ok(_) => Outcome::success("Reboot requested"),
            Err(e) => Outcome::from(e),
        }
    }

    /// Authorize `key` for the administrative user.
    ///
    /// The `.ssh` directory is also copied under the module directory, which
    /// survives firmware resets, and `rc.local` gets a hook restoring it at
    /// boot. The key is only appended if not already present.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::CommandFailed` if the key itself couldn't be
    /// installed. A failed backup is reported as [`KeyInstall::BackupFailed`].
    pub fn install_public_key(&self, key: &PublicKey) -> Result<KeyInstall> {
        self.run_ok(RemoteCommand::new("mkdir").arg("-p").arg(REMOTE_SSH_DIR))?;

        let present = self.status_of(
            RemoteCommand::new("grep")
                .arg("-qxF")
                .arg(key.as_str())
                .arg(REMOTE_AUTHORIZED_KEYS),
        )?;
        if present {
            debug!("public key already authorized");
        } else {
            self.run_ok(RemoteCommand::print(key.as_str()).append_to(REMOTE_AUTHORIZED_KEYS))?;
        }

        let backup = self.status_of(
            RemoteCommand::new("cp")
                .arg("-r")
                .arg(REMOTE_SSH_DIR)
                .arg(format!("{}/", self.module_dir)),
        )?;

        let hook = format!(
            "if [ ! -d {ssh}/ ]; then cp -r {dir}/.ssh/ /root/;fi",
            ssh = REMOTE_SSH_DIR,
            dir = self.module_dir
        );
        let hooked = self.status_of(
            RemoteCommand::new("grep")
                .arg("-qF")
                .arg(hook.as_str())
                .arg(REMOTE_RC_LOCAL),
        )? || self.status_of(RemoteCommand::print(hook.as_str()).append_to(REMOTE_RC_LOCAL))?;

        if backup && hooked {
            Ok(KeyInstall::Installed)
        } else {
            warn!(backup, hooked, "public key installed without backup");
            Ok(KeyInstall::BackupFailed)
        }
    }
}
