//! Constants used throughout fleetssh.
//!
//! Centralizes file names, remote paths and registry syntax.

/// Default administration root when neither `--home` nor `FLEETSSH_HOME` is set.
pub const DEFAULT_HOME: &str = "/etc/fleetssh";

/// Environment variable overriding the administration root.
pub const HOME_ENV: &str = "FLEETSSH_HOME";

/// Settings file name inside the administration root.
pub const SETTINGS_FILE: &str = "fleetssh.toml";

/// Registry file, relative to the administration root.
pub const REGISTRY_FILE: &str = "clients/clients.conf";

/// Key pair directory, relative to the administration root.
pub const KEY_DIR: &str = "keys";

/// Per-device configuration directory, relative to the administration root.
pub const CONFIG_DIR: &str = "configs";

/// Group key file prefix (`fleetssh-key_<group>`).
pub const KEY_PREFIX: &str = "fleetssh-key";

/// Per-device configuration file prefix (`fleetssh_<serial>.cfg`).
pub const UNIQUE_CONFIG_PREFIX: &str = "fleetssh";

/// Path argument that selects the per-device configuration file.
pub const UNIQUE_CONFIG_SENTINEL: &str = "$unique";

/// Delimiter around group names in marker lines.
pub const MARKER: &str = "@@";

/// Separator between IP and serial in membership lines.
pub const MEMBER_SEPARATOR: char = ':';

/// Characters allowed in group key passwords.
pub const PASSWORD_SPECIALS: &str = "@#$%^&+=!?-";

/// Minimum group key password length.
pub const PASSWORD_MIN_LEN: usize = 8;

/// RSA key size for group keys.
pub const KEY_BITS: u32 = 2048;

/// Remote directory holding the update stamp.
pub const REMOTE_STAMP_DIR: &str = "/root/fleetssh";

/// Remote update stamp file.
pub const REMOTE_STAMP_FILE: &str = "/root/fleetssh/latest_update.txt";

/// Remote SSH directory of the administrative user.
pub const REMOTE_SSH_DIR: &str = "/root/.ssh";

/// Remote authorized keys file.
pub const REMOTE_AUTHORIZED_KEYS: &str = "/root/.ssh/authorized_keys";

/// Remote startup script that restores `.ssh` after a firmware reset.
pub const REMOTE_RC_LOCAL: &str = "/etc/rc.local";

/// Example batch script written by `fleetssh example`.
pub const EXAMPLE_SCRIPT: &str = "fleetssh_example.cfg";
