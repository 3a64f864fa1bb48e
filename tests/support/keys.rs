//! Key provisioning doubles.
//!
//! `FixedPassword` answers prompts without a terminal and `FakeKeygen`
//! writes placeholder key files instead of running ssh-keygen.

use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use fleetssh::core::keys::{KeyGenerator, KeyProvisioner, PasswordSource};
use fleetssh::error::{KeyError, Result};
use zeroize::Zeroizing;

use super::fixtures::PASSWORD;

pub struct FixedPassword(pub &'static str);

impl PasswordSource for FixedPassword {
    fn password(&self, _group: &str) -> Result<Zeroizing<String>> {
        Ok(Zeroizing::new(self.0.to_string()))
    }
}

/// Prompt that behaves like Ctrl-C.
pub struct CancelledPrompt;

impl PasswordSource for CancelledPrompt {
    fn password(&self, _group: &str) -> Result<Zeroizing<String>> {
        Err(KeyError::Aborted.into())
    }
}

/// Writes `<private>` and `<private>.pub`; counts calls.
#[derive(Clone, Default)]
pub struct FakeKeygen {
    pub calls: Rc<Cell<usize>>,
    pub fail: bool,
}

impl KeyGenerator for FakeKeygen {
    fn generate(&self, private: &Path, _password: &str, comment: &str) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            return Err(KeyError::GenerationFailed("simulated failure".to_string()).into());
        }
        fs::write(private, "PRIVATE KEY\n").map_err(KeyError::ReadFailed)?;
        fs::write(
            format!("{}.pub", private.display()),
            format!("ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQ {}\n", comment),
        )
        .map_err(KeyError::ReadFailed)?;
        Ok(())
    }
}

/// Provisioner with a fixed password and placeholder keys.
pub fn provisioner(dir: &Path, keygen: FakeKeygen) -> KeyProvisioner {
    KeyProvisioner::new(dir, Box::new(FixedPassword(PASSWORD)), Box::new(keygen))
}
