//! Command-line interface.

pub mod batch;
pub mod client;
pub mod completions;
pub mod context;
pub mod device;
pub mod group;
pub mod output;
pub mod status;
pub mod upload;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::core::outcome::Status;
use crate::error::Result;

use self::context::Context;

/// Fleetssh - group-based SSH administration for router fleets.
#[derive(Parser)]
#[command(
    name = "fleetssh",
    about = "Group-based SSH administration for router fleets",
    version,
    after_help = "Exit status: 0 success, 1 partial success, 2 failure."
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Administration root (registry, keys, configs)
    #[arg(long, global = true, env = "FLEETSSH_HOME", value_name = "DIR")]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Device to connect to.
#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Device address
    #[arg(long)]
    pub ip: String,

    /// Group whose key authenticates the session
    /// (looked up from the registry when omitted)
    #[arg(short, long)]
    pub group: Option<String>,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Inspect and delete device groups
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },

    /// Enroll a device into a group
    Client {
        #[command(subcommand)]
        action: ClientAction,
    },

    /// Registry and identity lookups for a single device
    Device {
        #[command(subcommand)]
        action: DeviceAction,
    },

    /// Ping every member of a group
    Status {
        /// Group name
        group: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Upload a file, verify its digest, then activate it
    Upload {
        #[command(subcommand)]
        action: UploadAction,
    },

    /// Run a shell command on a device
    Exec {
        #[command(flatten)]
        device: DeviceArgs,
        /// Command and arguments to run
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },

    /// Set a device setting (PARAM=value, value may be $serial or $mac)
    Sws {
        #[command(flatten)]
        device: DeviceArgs,
        /// Setting to write
        setting: String,
    },

    /// Manage device user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage installed user modules
    Module {
        #[command(subcommand)]
        action: ModuleAction,
    },

    /// Record an update message on a device ($date expands to today)
    UpdateName {
        #[command(flatten)]
        device: DeviceArgs,
        /// Update message
        stamp: String,
    },

    /// Show the last recorded update message
    LatestUpdate {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Reboot a device
    Reboot {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Run a batch script against a device
    Run {
        /// Script path
        script: PathBuf,
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Write an annotated example script
    Example {
        /// Target directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Group subcommands.
#[derive(Subcommand)]
pub enum GroupAction {
    /// List group names
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the members of a group
    Members {
        /// Group name
        group: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a group and its key pair
    Delete {
        /// Group name
        group: String,
    },
}

/// Client subcommands.
#[derive(Subcommand)]
pub enum ClientAction {
    /// Add the device at IP to GROUP, creating the group key if needed
    Add {
        /// Group name
        group: String,
        /// Device address
        ip: String,
    },
}

/// Device subcommands.
#[derive(Subcommand)]
pub enum DeviceAction {
    /// Remove a device from its group by serial number
    Remove {
        /// Device serial number
        serial: String,
    },

    /// Print the device serial number
    Serial {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Print the device MAC address
    Mac {
        #[command(flatten)]
        device: DeviceArgs,
    },
}

/// Upload subcommands.
#[derive(Subcommand)]
pub enum UploadAction {
    /// Upload a configuration file and restore it into a profile
    Cfg {
        #[command(flatten)]
        device: DeviceArgs,
        /// Configuration file, or $unique for the device's own file
        source: String,
        /// Target profile: standard, alt1, alt2, alt3
        #[arg(long, default_value = "standard")]
        profile: String,
    },

    /// Upload and install a gzip-compressed user module
    Module {
        #[command(flatten)]
        device: DeviceArgs,
        /// Module archive
        path: PathBuf,
    },

    /// Upload a plain file
    File {
        #[command(flatten)]
        device: DeviceArgs,
        /// Local file
        local: PathBuf,
        /// Remote path or directory
        dest: String,
    },
}

/// User subcommands.
#[derive(Subcommand)]
pub enum UserAction {
    /// Create a user account
    Create {
        #[command(flatten)]
        device: DeviceArgs,
        /// User name
        name: String,
        /// Password; ($serial) and ($mac) are substituted
        password: String,
        /// Account role: admin or regular
        #[arg(long, default_value = "regular")]
        role: String,
    },

    /// Delete a user account
    Delete {
        #[command(flatten)]
        device: DeviceArgs,
        /// User name
        name: String,
    },

    /// Change a user's password
    Passwd {
        #[command(flatten)]
        device: DeviceArgs,
        /// User name
        name: String,
        /// New password; ($serial) and ($mac) are substituted
        password: String,
    },
}

/// Module subcommands.
#[derive(Subcommand)]
pub enum ModuleAction {
    /// Remove an installed user module
    Remove {
        #[command(flatten)]
        device: DeviceArgs,
        /// Module name
        name: String,
    },
}

/// Execute a command and return the status that becomes the exit code.
pub fn execute(cli: Cli) -> Result<Status> {
    use Command::*;

    if let Completions { shell } = cli.command {
        return completions::execute(shell);
    }
    if let Example { dir } = cli.command {
        return batch::example(&dir);
    }

    let ctx = Context::load(cli.home)?;

    match cli.command {
        Group { action } => match action {
            GroupAction::List { json } => group::list(&ctx, json),
            GroupAction::Members { group, json } => group::members(&ctx, &group, json),
            GroupAction::Delete { group } => group::delete(&ctx, &group),
        },
        Client { action } => match action {
            ClientAction::Add { group, ip } => client::add(&ctx, &group, &ip),
        },
        Device { action } => match action {
            DeviceAction::Remove { serial } => client::remove(&ctx, &serial),
            DeviceAction::Serial { device } => device::serial(&ctx, &device),
            DeviceAction::Mac { device } => device::mac(&ctx, &device),
        },
        Status { group, json } => status::execute(&ctx, &group, json),
        Upload { action } => match action {
            UploadAction::Cfg {
                device,
                source,
                profile,
            } => upload::cfg(&ctx, &device, &source, &profile),
            UploadAction::Module { device, path } => upload::module(&ctx, &device, &path),
            UploadAction::File {
                device,
                local,
                dest,
            } => upload::file(&ctx, &device, &local, &dest),
        },
        Exec { device, command } => device::exec(&ctx, &device, &command.join(" ")),
        Sws { device, setting } => device::sws(&ctx, &device, &setting),
        User { action } => match action {
            UserAction::Create {
                device,
                name,
                password,
                role,
            } => device::create_user(&ctx, &device, &name, &password, &role),
            UserAction::Delete { device, name } => device::delete_user(&ctx, &device, &name),
            UserAction::Passwd {
                device,
                name,
                password,
            } => device::change_password(&ctx, &device, &name, &password),
        },
        Module { action } => match action {
            ModuleAction::Remove { device, name } => device::remove_module(&ctx, &device, &name),
        },
        UpdateName { device, stamp } => device::update_name(&ctx, &device, &stamp),
        LatestUpdate { device } => device::latest_update(&ctx, &device),
        Reboot { device } => device::reboot(&ctx, &device),
        Run { script, device } => batch::run(&ctx, &script, &device),
        Example { .. } | Completions { .. } => Ok(crate::core::outcome::Status::Success),
    }
}
