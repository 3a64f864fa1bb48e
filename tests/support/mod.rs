//! Test support utilities for fleetssh integration tests.
//!
//! Provides an isolated administration root, CLI helpers and an in-memory
//! router standing in for real devices.

#![allow(dead_code)]

pub mod assertions;
pub mod commands;
pub mod fixtures;
pub mod keys;
pub mod router;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use keys::*;
#[allow(unused_imports)]
pub use router::*;

use std::fs;
use std::path::PathBuf;

use fleetssh::core::config::{Layout, Settings};
use fleetssh::core::registry::FlatFileRegistry;
use tempfile::TempDir;

/// Test environment with an isolated administration root.
///
/// Child processes get the root through `--home`, so tests never touch
/// process-global state and can run in parallel.
pub struct Test {
    /// Administration root (registry, keys, configs)
    pub home: TempDir,
    /// Scratch directory for local files
    pub dir: TempDir,
}

impl Test {
    pub fn new() -> Self {
        let home = TempDir::new().expect("failed to create temp home");
        let dir = TempDir::new().expect("failed to create temp dir");
        Self { home, dir }
    }

    /// Create an environment whose registry already has `content`.
    pub fn with_registry(content: &str) -> Self {
        let t = Self::new();
        let path = t.layout().registry();
        fs::create_dir_all(path.parent().expect("registry has a parent"))
            .expect("failed to create registry dir");
        fs::write(&path, content).expect("failed to write registry");
        t
    }

    pub fn layout(&self) -> Layout {
        Layout::new(self.home.path())
    }

    pub fn settings(&self) -> Settings {
        Settings::default()
    }

    pub fn registry(&self) -> FlatFileRegistry {
        FlatFileRegistry::new(self.layout().registry())
    }

    /// Current registry content, empty if the file doesn't exist.
    pub fn registry_content(&self) -> String {
        fs::read_to_string(self.layout().registry()).unwrap_or_default()
    }

    /// Write a local scratch file and return its path.
    pub fn local_file(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("failed to write local file");
        path
    }
}
