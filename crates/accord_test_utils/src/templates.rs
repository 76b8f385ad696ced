//! Throwaway template directories.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// RAII guard around a temporary template directory.
///
/// The directory and everything written into it is removed on Drop.
pub struct TemplateDirGuard {
    dir: TempDir,
}

impl TemplateDirGuard {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("accord-templates-")
            .tempdir()
            .context("Failed to create template directory")?;
        debug!("Created template directory: {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `binary` as `file_name` and return its full path.
    pub fn add(&self, file_name: &str, binary: &[u8]) -> Result<PathBuf> {
        let path = self.dir.path().join(file_name);
        fs::write(&path, binary).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
