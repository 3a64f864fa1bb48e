//! Fleetssh - group-based SSH administration for router fleets.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── group         # List, inspect and delete groups
//! │   ├── client        # Enroll and remove devices
//! │   ├── status        # Group liveness checks
//! │   ├── upload        # Verified uploads (cfg, module, file)
//! │   ├── device        # One-shot device maintenance
//! │   ├── batch         # Script runner and example script
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── config        # fleetssh.toml settings and directory layout
//!     ├── registry/     # Group membership store
//!     │   ├── mod       # GroupStore trait and flat-file implementation
//!     │   ├── scan      # Line classification and group spans
//!     │   └── file      # Atomic file replacement
//!     ├── keys          # Per-group key pairs
//!     ├── remote/       # Remote execution backends
//!     │   ├── mod       # RemoteExecutor and FileTransfer traits
//!     │   ├── command   # Remote command builder and quoting
//!     │   └── openssh   # ssh/scp subprocess implementation
//!     ├── device        # Router maintenance operations
//!     ├── digest        # SHA-256 integrity checks
//!     ├── transfer      # Upload, verify, activate
//!     ├── enroll        # Add-client / delete-group flows
//!     ├── status        # Concurrent ping
//!     └── batch         # Script parsing and execution
//! ```
//!
//! # Features
//!
//! - One RSA key pair per device group, created on first enrollment
//! - Line-oriented registry with all-or-nothing updates
//! - Uploads are only activated after a SHA-256 match
//! - Batch scripts that keep going past failed steps

pub mod cli;
pub mod core;
pub mod error;
