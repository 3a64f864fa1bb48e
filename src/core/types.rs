//! Type aliases for domain concepts.
//!
//! Provides semantic type aliases to make function signatures more descriptive.

/// A group name, as written between `@@` markers in the registry.
pub type GroupName = String;

/// A device serial number as reported by the router.
pub type Serial = String;

/// A device network address as registered in a group.
pub type Ip = String;

/// An OpenSSH public key line (`ssh-rsa AAAA... comment`).
pub type PublicKey = String;
