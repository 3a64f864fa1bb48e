//! Group key pairs.
//!
//! Every group has one passphrase-protected RSA key pair,
//! `<keys dir>/fleetssh-key_<group>` and its `.pub` half. Pairs are created on
//! first use and never rotated: a lone half is reported, not replaced. Password entry and key generation sit behind
//! the [`PasswordSource`] and [`KeyGenerator`] traits so the provisioning flow
//! can be exercised without a terminal or `ssh-keygen`.

use std::fs;
use std::io::{self, BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use dialoguer::Password;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::core::constants::{KEY_BITS, KEY_PREFIX};
use crate::core::types::PublicKey;
use crate::core::validation;
use crate::error::{KeyError, Result};

/// Paths of one group's key pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub group: String,
    pub private: PathBuf,
    pub public: PathBuf,
}

impl KeyPair {
    pub fn for_group(dir: &Path, group: &str) -> Self {
        let private = dir.join(format!("{}_{}", KEY_PREFIX, group));
        let mut public = private.clone().into_os_string();
        public.push(".pub");

        Self {
            group: group.to_string(),
            private,
            public: PathBuf::from(public),
        }
    }

    /// True when both halves are present.
    pub fn exists(&self) -> bool {
        self.private.is_file() && self.public.is_file()
    }

    /// True when exactly one half is present.
    pub fn is_incomplete(&self) -> bool {
        self.private.is_file() != self.public.is_file()
    }

    /// Read the public key line.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::Missing` if the `.pub` file does not exist.
    pub fn public_key(&self) -> Result<PublicKey> {
        if !self.public.is_file() {
            return Err(KeyError::Missing(self.group.clone()).into());
        }
        let key = fs::read_to_string(&self.public).map_err(KeyError::ReadFailed)?;
        Ok(key.trim().to_string())
    }

    /// Delete whichever halves exist. Returns true if anything was removed.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::RemoveFailed` if an existing file can't be deleted.
    pub fn remove(&self) -> Result<bool> {
        let mut removed = false;
        for path in [&self.private, &self.public] {
            match fs::remove_file(path) {
                Ok(()) => removed = true,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(KeyError::RemoveFailed(e).into()),
            }
        }
        Ok(removed)
    }
}

/// Result of [`KeyProvisioner::ensure_group_keys`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub pair: KeyPair,
    /// False when the pair already existed.
    pub created: bool,
}

/// Supplies the passphrase for a new group key.
pub trait PasswordSource {
    /// # Errors
    ///
    /// Returns `KeyError::Aborted` if the user cancelled.
    fn password(&self, group: &str) -> Result<Zeroizing<String>>;
}

/// Writes a passphrase-protected key pair.
pub trait KeyGenerator {
    /// Create `private` and `private.pub`.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::GenerationFailed` if the pair was not written.
    fn generate(&self, private: &Path, password: &str, comment: &str) -> Result<()>;
}

fn is_abort(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::UnexpectedEof
    )
}

/// Interactive passphrase entry.
///
/// On a terminal the password is typed twice with hidden input and re-asked
/// until both entries match and the policy is met. With piped stdin a single
/// line is read instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    fn read_piped() -> Result<Zeroizing<String>> {
        let mut line = Zeroizing::new(String::new());
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| KeyError::Prompt(e.to_string()))?;
        if read == 0 {
            return Err(KeyError::Aborted.into());
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(line)
    }
}

impl PasswordSource for TerminalPrompt {
    fn password(&self, group: &str) -> Result<Zeroizing<String>> {
        if !io::stdin().is_terminal() {
            return Self::read_piped();
        }

        let result = Password::new()
            .with_prompt(format!("Password for the '{}' group key", group))
            .with_confirmation("Repeat password", "Passwords do not match")
            .validate_with(|input: &String| -> std::result::Result<(), String> {
                if validation::password_allowed(input) {
                    Ok(())
                } else {
                    Err(crate::error::ValidationError::WeakPassword.to_string())
                }
            })
            .interact();

        match result {
            Ok(password) => Ok(Zeroizing::new(password)),
            Err(dialoguer::Error::IO(e)) if is_abort(&e) => Err(KeyError::Aborted.into()),
            Err(e) => Err(KeyError::Prompt(e.to_string()).into()),
        }
    }
}

/// Key generation through the `ssh-keygen` binary.
///
/// `ssh-keygen` only takes a non-interactive passphrase through `-N`, so the
/// passphrase is visible in the local process list while the key is generated.
#[derive(Debug, Clone)]
pub struct SshKeygen {
    program: PathBuf,
}

impl SshKeygen {
    /// Use `program` (a name looked up in `PATH`, or a path) as `ssh-keygen`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SshKeygen {
    fn default() -> Self {
        Self::new("ssh-keygen")
    }
}

impl KeyGenerator for SshKeygen {
    fn generate(&self, private: &Path, password: &str, comment: &str) -> Result<()> {
        let program = which::which(&self.program).map_err(|_| KeyError::KeygenNotFound)?;
        debug!(program = %program.display(), path = %private.display(), bits = KEY_BITS, "running ssh-keygen");

        let output = Command::new(&program)
            .args(["-q", "-t", "rsa", "-b"])
            .arg(KEY_BITS.to_string())
            .arg("-N")
            .arg(password)
            .arg("-C")
            .arg(comment)
            .arg("-f")
            .arg(private)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => KeyError::KeygenNotFound,
                _ => KeyError::GenerationFailed(e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(KeyError::GenerationFailed(if stderr.is_empty() {
                format!("ssh-keygen exited with {}", output.status)
            } else {
                stderr
            })
            .into());
        }

        Ok(())
    }
}

/// Locates or creates group key pairs.
pub struct KeyProvisioner {
    dir: PathBuf,
    passwords: Box<dyn PasswordSource>,
    generator: Box<dyn KeyGenerator>,
}

impl KeyProvisioner {
    pub fn new(
        dir: impl Into<PathBuf>,
        passwords: Box<dyn PasswordSource>,
        generator: Box<dyn KeyGenerator>,
    ) -> Self {
        Self {
            dir: dir.into(),
            passwords,
            generator,
        }
    }

    /// Key directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths of `group`'s pair, whether or not it exists.
    pub fn pair(&self, group: &str) -> KeyPair {
        KeyPair::for_group(&self.dir, group)
    }

    /// Return the group's key pair, creating it if both halves are missing.
    ///
    /// # Errors
    ///
    /// `KeyError::IncompletePair` if only one half exists; both files are left alone.
    /// `KeyError::Aborted` if password entry was cancelled,
    /// `ValidationError::WeakPassword` if the password breaks the policy,
    /// `KeyError::GenerationFailed` if no pair could be written.
    /// In every other error case no key files are left behind.
    pub fn ensure_group_keys(&self, group: &str) -> Result<Provisioned> {
        validation::validate_group(group)?;
        let pair = self.pair(group);

        if pair.exists() {
            debug!(group, "group keys already present");
            return Ok(Provisioned {
                pair,
                created: false,
            });
        }

        if pair.is_incomplete() {
            warn!(group, "refusing to replace an incomplete key pair");
            return Err(KeyError::IncompletePair(group.to_string()).into());
        }

        let password = self.passwords.password(group)?;
        validation::validate_password(&password)?;

        create_key_dir(&self.dir)?;

        let comment = format!("{}_{}", KEY_PREFIX, group);
        if let Err(e) = self.generator.generate(&pair.private, &password, &comment) {
            let _ = pair.remove();
            return Err(e);
        }

        if !pair.exists() {
            let _ = pair.remove();
            return Err(KeyError::GenerationFailed(format!(
                "{} was not written",
                pair.public.display()
            ))
            .into());
        }

        info!(group, "group keys created");
        Ok(Provisioned {
            pair,
            created: true,
        })
    }

    /// Delete the group's key pair. Returns false if there was none.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::RemoveFailed` if a file can't be deleted.
    pub fn remove_group_keys(&self, group: &str) -> Result<bool> {
        let removed = self.pair(group).remove()?;
        if removed {
            info!(group, "group keys removed");
        }
        Ok(removed)
    }
}

fn create_key_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| KeyError::GenerationFailed(e.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))
            .map_err(|e| KeyError::GenerationFailed(e.to_string()))?;
    }

    Ok(())
}
