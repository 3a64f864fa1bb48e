//! Batch scripts.
//!
//! A script lists maintenance steps for one device, one per line:
//!
//! ```text
//! # comment
//! upload-cfg = /srv/configs/site.cfg, alt2
//! sws = SNMP_NAME=$serial
//! reboot
//! ```
//!
//! The whole script is parsed before anything runs. Steps then run in order;
//! a failing step doesn't stop the ones after it and the script's status is
//! the worst step status.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::config::{Layout, Settings};
use crate::core::constants::EXAMPLE_SCRIPT;
use crate::core::device::{Role, Router};
use crate::core::enroll;
use crate::core::keys::KeyProvisioner;
use crate::core::outcome::{Outcome, Status};
use crate::core::registry::GroupStore;
use crate::core::remote::Remote;
use crate::core::transfer::{ConfigSource, Profile, VerifiedTransfer};
use crate::error::{Error, Result, ValidationError};

/// One script command with its parsed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    AddClient { ip: String, group: String },
    AddModule { path: PathBuf },
    ChangePassword { user: String, password: String },
    CreateUser { user: String, password: String, role: Role },
    DeleteUser { user: String },
    LatestUpdate,
    Reboot,
    RemoveModule { name: String },
    RouterCommand { script: String },
    SetSetting { setting: String },
    UpdateName { stamp: String },
    UploadConfig { source: ConfigSource, profile: Profile },
    UploadFile { local: PathBuf, dest: String },
}

impl Step {
    /// Script name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Step::AddClient { .. } => "add-client",
            Step::AddModule { .. } => "add-um",
            Step::ChangePassword { .. } => "change-passwd",
            Step::CreateUser { .. } => "create-user",
            Step::DeleteUser { .. } => "delete-user",
            Step::LatestUpdate => "latest-update",
            Step::Reboot => "reboot",
            Step::RemoveModule { .. } => "remove-um",
            Step::RouterCommand { .. } => "router-command",
            Step::SetSetting { .. } => "sws",
            Step::UpdateName { .. } => "update-name",
            Step::UploadConfig { .. } => "upload-cfg",
            Step::UploadFile { .. } => "upload-file",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed step and the line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    /// One-based line number.
    pub line: usize,
    pub step: Step,
}

const UNSUPPORTED: [&str; 4] = ["write-excel", "login", "login-group", "login-key"];

fn script_error(line: usize, reason: impl Into<String>) -> Error {
    ValidationError::Script {
        line,
        reason: reason.into(),
    }
    .into()
}

/// Split `args` into exactly `n` comma-separated fields; the last one keeps
/// any further commas.
fn fields(line: usize, command: &str, args: &str, n: usize) -> Result<Vec<String>> {
    let parts: Vec<String> = args.splitn(n, ',').map(|s| s.trim().to_string()).collect();
    if parts.len() != n || parts.iter().any(String::is_empty) {
        return Err(script_error(
            line,
            format!("'{}' expects {} argument{}", command, n, if n == 1 { "" } else { "s" }),
        ));
    }
    Ok(parts)
}

fn parse_step(line: usize, command: &str, args: &str) -> Result<Step> {
    let with_line = |e: Error| script_error(line, e.to_string());

    let step = match command {
        "add-client" => {
            let f = fields(line, command, args, 2)?;
            Step::AddClient {
                ip: f[0].clone(),
                group: f[1].clone(),
            }
        }
        "add-um" => Step::AddModule {
            path: PathBuf::from(&fields(line, command, args, 1)?[0]),
        },
        "change-passwd" => {
            let f = fields(line, command, args, 2)?;
            Step::ChangePassword {
                user: f[0].clone(),
                password: f[1].clone(),
            }
        }
        "create-user" => {
            let f = fields(line, command, args, 3)?;
            Step::CreateUser {
                user: f[0].clone(),
                password: f[1].clone(),
                role: f[2].parse().map_err(with_line)?,
            }
        }
        "delete-user" => Step::DeleteUser {
            user: fields(line, command, args, 1)?.remove(0),
        },
        "latest-update" => Step::LatestUpdate,
        "reboot" => Step::Reboot,
        "remove-um" => Step::RemoveModule {
            name: fields(line, command, args, 1)?.remove(0),
        },
        "router-command" => Step::RouterCommand {
            script: fields(line, command, args, 1)?.remove(0),
        },
        "sws" => Step::SetSetting {
            setting: fields(line, command, args, 1)?.remove(0),
        },
        "update-name" => Step::UpdateName {
            stamp: fields(line, command, args, 1)?.remove(0),
        },
        "upload-cfg" => {
            let f = fields(line, command, args, 2)?;
            Step::UploadConfig {
                source: ConfigSource::parse(&f[0]),
                profile: f[1].parse().map_err(with_line)?,
            }
        }
        "upload-file" => {
            let f = fields(line, command, args, 2)?;
            Step::UploadFile {
                local: PathBuf::from(&f[0]),
                dest: f[1].clone(),
            }
        }
        other if UNSUPPORTED.contains(&other) => {
            return Err(script_error(line, format!("'{}' is not supported", other)))
        }
        other => return Err(script_error(line, format!("unknown command '{}'", other))),
    };

    Ok(step)
}

/// Parse a whole script.
///
/// # Errors
///
/// Returns `ValidationError::Script` for the first bad line.
pub fn parse(text: &str) -> Result<Vec<ScriptLine>> {
    let mut steps = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (command, args) = match trimmed.split_once('=') {
            Some((command, args)) => (command.trim(), args.trim()),
            None => (trimmed, ""),
        };

        let step = parse_step(line, command, args)?;
        debug!(line, command = step.name(), "parsed script step");
        steps.push(ScriptLine { line, step });
    }

    Ok(steps)
}

/// Read and parse a script file.
///
/// # Errors
///
/// Returns `Error::Io` if the file can't be read, or a parse error.
pub fn load(path: &Path) -> Result<Vec<ScriptLine>> {
    parse(&fs::read_to_string(path)?)
}

/// Outcome of every step of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub steps: Vec<(ScriptLine, Outcome)>,
}

impl BatchReport {
    /// Worst step status; an empty script succeeds.
    pub fn status(&self) -> Status {
        self.steps
            .iter()
            .map(|(_, o)| o.status)
            .fold(Status::Success, Status::worst)
    }

    pub fn failed(&self) -> usize {
        self.steps
            .iter()
            .filter(|(_, o)| o.status == Status::Failure)
            .count()
    }
}

/// Everything a script needs to act on one device.
pub struct Session<'a, S, R: ?Sized> {
    pub store: &'a S,
    pub keys: &'a KeyProvisioner,
    pub remote: &'a R,
    pub settings: &'a Settings,
    pub layout: &'a Layout,
}

impl<'a, S, R> Session<'a, S, R>
where
    S: GroupStore,
    R: Remote + ?Sized,
{
    fn router(&self) -> Router<'a, R> {
        Router::new(self.remote, &self.settings.remote)
    }

    fn transfer(&self) -> VerifiedTransfer<'a, R> {
        VerifiedTransfer::new(self.remote, &self.settings.remote, self.layout)
    }

    /// Run a single step.
    pub fn run_step(&self, step: &Step) -> Outcome {
        let router = self.router();

        match step {
            Step::AddClient { ip, group } => {
                enroll::add_client(self.store, self.keys, &router, group, ip)
            }
            Step::AddModule { path } => {
                Outcome::from_result(self.transfer().upload_module(path).map(Outcome::from))
            }
            Step::ChangePassword { user, password } => router.change_password(user, password),
            Step::CreateUser {
                user,
                password,
                role,
            } => router.create_user(user, password, *role),
            Step::DeleteUser { user } => router.delete_user(user),
            Step::LatestUpdate => router.latest_update(),
            Step::Reboot => router.reboot(),
            Step::RemoveModule { name } => router.remove_module(name),
            Step::RouterCommand { script } => router.run_command(script),
            Step::SetSetting { setting } => router.set_setting(setting),
            Step::UpdateName { stamp } => router.update_name(stamp),
            Step::UploadConfig { source, profile } => Outcome::from_result(
                self.transfer()
                    .upload_config(source, *profile)
                    .map(Outcome::from),
            ),
            Step::UploadFile { local, dest } => Outcome::from_result(
                self.transfer().upload_file(local, dest).map(Outcome::from),
            ),
        }
    }

    /// Run every step in order, reporting each as it finishes.
    pub fn run<F>(&self, script: Vec<ScriptLine>, mut on_step: F) -> BatchReport
    where
        F: FnMut(&ScriptLine, &Outcome),
    {
        let mut steps = Vec::with_capacity(script.len());

        for line in script {
            let outcome = self.run_step(&line.step);
            info!(line = line.line, command = line.step.name(), status = %outcome.status, "script step finished");
            on_step(&line, &outcome);
            steps.push((line, outcome));
        }

        BatchReport { steps }
    }
}

/// Annotated script showing every command.
pub fn example_script() -> &'static str {
    r#"# Example fleetssh script with the syntax of every available command.
# Run it with: fleetssh run <script> --ip <address> [--group <group>]

# add-client = <client address>, <group>
add-client = 10.100.194.1, fleet_group

# add-um = <path to user module>
add-um = /home/fleetssh/user_modules/mymodule.tgz

# change-passwd = <user name>, <password>
change-passwd = fleet_user, MynewP455!?

# create-user = <user name>, <password>, admin/regular
create-user = fleet_user, B1gsecret10-!, admin

# delete-user = <user name>
delete-user = fleet_user

# latest-update
latest-update

# reboot
reboot

# remove-um = <user module name>
remove-um = mymodule

# router-command = <custom command>
router-command = /etc/init.d/eth restart

# sws = <PARAM=value>, value may be $serial or $mac
sws = SNMP_NAME=example_name

# update-name = <update message>, $date expands to today
update-name = Updated firmware to 6.1.5 on $date

# upload-cfg = <path to cfg file or $unique>, standard/alt1/alt2/alt3
upload-cfg = /home/fleetssh/configs/router_settings.cfg, standard

# upload-file = <path to local file>, <remote path or directory>
upload-file = /home/fleetssh/files/example_file.txt, /root
"#
}

/// Write [`example_script`] into `dir`, returning the file path.
///
/// # Errors
///
/// Returns `Error::Io` if the file can't be written.
pub fn write_example(dir: &Path) -> Result<PathBuf> {
    let path = dir.join(EXAMPLE_SCRIPT);
    fs::write(&path, example_script())?;
    Ok(path)
}
