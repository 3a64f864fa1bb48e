//! Input validation for fleetssh operations.
//!
//! The registry has no escaping, so every token that ends up in it is
//! checked against the line grammar before any write.

use crate::core::constants::{MARKER, MEMBER_SEPARATOR, PASSWORD_MIN_LEN, PASSWORD_SPECIALS};
use crate::error::{Result, ValidationError};

fn invalid(field: &'static str, value: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidToken {
        field,
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Checks shared by every registry token.
fn validate_token(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ValidationError::Empty { field }.into());
    }

    if value.contains(MARKER) {
        return Err(invalid(field, value, format!("cannot contain '{}'", MARKER)).into());
    }

    if let Some(ch) = value
        .chars()
        .find(|c| c.is_whitespace() || *c == MEMBER_SEPARATOR)
    {
        return Err(invalid(field, value, format!("invalid character {:?}", ch)).into());
    }

    Ok(())
}

/// Validate a group name.
///
/// Group names are registry tokens and also name the group's key files,
/// so path separators and leading dots are rejected as well.
///
/// # Errors
///
/// Returns `ValidationError` if the name is empty or contains forbidden characters.
pub fn validate_group(name: &str) -> Result<()> {
    validate_token("group", name)?;

    if name.contains('/') || name.contains('\\') {
        return Err(invalid("group", name, "cannot contain a path separator").into());
    }

    if name.starts_with('.') {
        return Err(invalid("group", name, "cannot start with '.'").into());
    }

    Ok(())
}

/// Validate a client address.
///
/// # Errors
///
/// Returns `ValidationError` if the address is empty or contains forbidden characters.
pub fn validate_ip(ip: &str) -> Result<()> {
    validate_token("ip", ip)
}

/// Validate a device serial.
///
/// # Errors
///
/// Returns `ValidationError` if the serial is empty or contains forbidden characters.
pub fn validate_serial(serial: &str) -> Result<()> {
    validate_token("serial", serial)
}

/// Check a group key password against the policy:
/// at least 8 characters from `A-Za-z0-9@#$%^&+=!?-`.
pub fn password_allowed(password: &str) -> bool {
    password.chars().count() >= PASSWORD_MIN_LEN
        && password
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c))
}

/// Validate a group key password.
///
/// # Errors
///
/// Returns `ValidationError::WeakPassword` if the policy is not met.
pub fn validate_password(password: &str) -> Result<()> {
    if password_allowed(password) {
        Ok(())
    } else {
        Err(ValidationError::WeakPassword.into())
    }
}

/// Validate a user module name (a directory under the module root).
///
/// # Errors
///
/// Returns `ValidationError` if the name could escape the module directory.
pub fn validate_module_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ValidationError::Empty { field: "module" }.into());
    }

    if name.contains('/') || name == "." || name == ".." {
        return Err(invalid("module", name, "must be a plain directory name").into());
    }

    Ok(())
}

/// Split a `PARAM=value` setting into its parts.
///
/// # Errors
///
/// Returns `ValidationError::InvalidSetting` when there is no `=` or the
/// parameter name is not `[A-Za-z0-9_]+`.
pub fn parse_setting(setting: &str) -> Result<(&str, &str)> {
    let (param, value) = setting
        .split_once('=')
        .ok_or_else(|| ValidationError::InvalidSetting(setting.to_string()))?;

    let param = param.trim();
    if param.is_empty() || !param.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidSetting(setting.to_string()).into());
    }

    Ok((param, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_groups() {
        assert!(validate_group("lab").is_ok());
        assert!(validate_group("site-42_north").is_ok());
        assert!(validate_group("a").is_ok());
    }

    #[test]
    fn test_invalid_groups() {
        assert!(validate_group("").is_err());
        assert!(validate_group("two words").is_err());
        assert!(validate_group("a@@b").is_err());
        assert!(validate_group("a:b").is_err());
        assert!(validate_group("../etc").is_err());
        assert!(validate_group(".hidden").is_err());
    }

    #[test]
    fn test_single_at_sign_allowed() {
        assert!(validate_group("ops@hq").is_ok());
    }

    #[test]
    fn test_ip_and_serial_tokens() {
        assert!(validate_ip("10.0.0.5").is_ok());
        assert!(validate_serial("SN123").is_ok());
        assert!(validate_ip("fe80::1").is_err());
        assert!(validate_serial("SN 1").is_err());
        assert!(validate_serial("").is_err());
    }

    #[test]
    fn test_password_policy() {
        assert!(password_allowed("Secret12"));
        assert!(password_allowed("B1gsecret10-!"));
        assert!(!password_allowed("short1"));
        assert!(!password_allowed("has space in it"));
        assert!(!password_allowed("unicodé123"));
        assert!(validate_password("abc").is_err());
    }

    #[test]
    fn test_module_names() {
        assert!(validate_module_name("mymodule").is_ok());
        assert!(validate_module_name("..").is_err());
        assert!(validate_module_name("a/b").is_err());
        assert!(validate_module_name("").is_err());
    }

    #[test]
    fn test_parse_setting() {
        assert_eq!(parse_setting("SNMP_NAME=router").unwrap(), ("SNMP_NAME", "router"));
        assert_eq!(parse_setting("A=b=c").unwrap(), ("A", "b=c"));
        assert_eq!(parse_setting("EMPTY=").unwrap(), ("EMPTY", ""));
        assert!(parse_setting("novalue").is_err());
        assert!(parse_setting("=x").is_err());
        assert!(parse_setting("BAD NAME=x").is_err());
    }
}
