//! Registry file persistence.
//!
//! Reads treat a missing file as an empty registry. Writes go to a temporary
//! file in the same directory which is synced and then renamed over the
//! original, so a reader never observes a half-written registry.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{RegistryError, Result};

/// Read the whole registry; a missing file reads as empty.
pub(super) fn read(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(RegistryError::Read {
            path: path.to_path_buf(),
            source,
        }
        .into()),
    }
}

/// Atomically replace the registry with `content`.
pub(super) fn replace(path: &Path, content: &str) -> Result<()> {
    let write_err = |source: io::Error| RegistryError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(content.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;

    // Keep the original file mode across the rename.
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions()).map_err(write_err)?;
    }

    tmp.persist(path).map_err(|e| write_err(e.error))?;
    debug!(path = %path.display(), bytes = content.len(), "registry replaced");

    Ok(())
}
