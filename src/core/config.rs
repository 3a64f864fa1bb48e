//! Settings and filesystem layout.
//!
//! Handles the optional `fleetssh.toml` inside the administration root and
//! derives the registry, key and per-device configuration paths from it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::constants;
use crate::error::{ConfigError, Result};

/// Settings stored in `<home>/fleetssh.toml`. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub ssh: SshSettings,
    #[serde(default)]
    pub remote: RemoteSettings,
    #[serde(default)]
    pub status: StatusSettings,
}

/// How to reach devices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SshSettings {
    /// Remote login user
    pub user: String,
    /// SSH port
    pub port: u16,
    /// Connection timeout in seconds
    pub connect_timeout: u32,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            user: "root".to_string(),
            port: 22,
            connect_timeout: 10,
        }
    }
}

/// Where uploads land on the device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteSettings {
    /// Directory receiving configuration files and module archives
    pub staging_dir: String,
    /// Directory user modules are extracted into
    pub module_dir: String,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            staging_dir: "/root".to_string(),
            module_dir: "/opt".to_string(),
        }
    }
}

/// Liveness probe tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatusSettings {
    /// Seconds to wait for a ping reply
    pub ping_timeout: u32,
}

impl Default for StatusSettings {
    fn default() -> Self {
        Self { ping_timeout: 2 }
    }
}

impl Settings {
    /// Load settings from `<home>/fleetssh.toml`, or defaults if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the TOML is malformed, or
    /// `ConfigError::InvalidValue` if validation fails.
    pub fn load(home: &Path) -> Result<Self> {
        let path = home.join(constants::SETTINGS_FILE);
        debug!(path = %path.display(), "loading settings");

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path).map_err(ConfigError::ReadFile)?;
        let settings: Self = toml::from_str(&contents).map_err(ConfigError::Parse)?;
        settings.validate()?;

        Ok(settings)
    }

    /// Save settings to `<home>/fleetssh.toml`.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file write fails.
    pub fn save(&self, home: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::create_dir_all(home)?;
        std::fs::write(home.join(constants::SETTINGS_FILE), contents)?;
        Ok(())
    }

    /// Validate field values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` on the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.ssh.user.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ssh.user",
                reason: "cannot be empty".to_string(),
            }
            .into());
        }

        if self.ssh.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ssh.port",
                reason: "must be between 1 and 65535".to_string(),
            }
            .into());
        }

        for (field, dir) in [
            ("remote.staging_dir", &self.remote.staging_dir),
            ("remote.module_dir", &self.remote.module_dir),
        ] {
            if !dir.starts_with('/') {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("must be an absolute path, got '{}'", dir),
                }
                .into());
            }
        }

        if self.status.ping_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "status.ping_timeout",
                reason: "must be at least 1 second".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// Local filesystem layout under the administration root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    home: PathBuf,
}

impl Layout {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// Resolve the root from an explicit path, `FLEETSSH_HOME`, or the default.
    pub fn resolve(explicit: Option<PathBuf>) -> Self {
        let home = explicit
            .or_else(|| std::env::var_os(constants::HOME_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(constants::DEFAULT_HOME));
        Self::new(home)
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Group registry file.
    pub fn registry(&self) -> PathBuf {
        self.home.join(constants::REGISTRY_FILE)
    }

    /// Directory holding group key pairs.
    pub fn key_dir(&self) -> PathBuf {
        self.home.join(constants::KEY_DIR)
    }

    /// Directory holding per-device configuration files.
    pub fn config_dir(&self) -> PathBuf {
        self.home.join(constants::CONFIG_DIR)
    }

    /// Per-device configuration file for `serial`.
    pub fn unique_config(&self, serial: &str) -> PathBuf {
        self.config_dir().join(format!(
            "{}_{}.cfg",
            constants::UNIQUE_CONFIG_PREFIX,
            serial
        ))
    }
}
