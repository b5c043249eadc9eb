//! Disposable browser profile directory
//!
//! Chrome gets a private, uniquely-named user-data-dir for the run. The guard
//! removes it when dropped, on success and error paths alike.

use std::path::Path;

use tempfile::TempDir;
use tracing::debug;

use super::BrowserError;

/// Name prefix for scratch directories under the platform temp root.
pub const SCRATCH_PREFIX: &str = "manytabs-";

/// Scoped guard around the browser's scratch profile directory.
///
/// Must outlive every session that uses it; dropping it deletes the directory.
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Allocate a fresh scratch directory under the platform temp root.
    pub fn new() -> Result<Self, BrowserError> {
        let dir = tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir()?;
        debug!("allocated scratch dir {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Path to the directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_dir_exists_with_prefix() {
        let scratch = ScratchDir::new().unwrap();
        assert!(scratch.path().is_dir());
        let name = scratch.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(SCRATCH_PREFIX), "unexpected name: {name}");
    }

    #[test]
    fn test_scratch_dir_removed_on_drop() {
        let path = {
            let scratch = ScratchDir::new().unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_scratch_dirs_are_unique() {
        let a = ScratchDir::new().unwrap();
        let b = ScratchDir::new().unwrap();
        assert_ne!(a.path(), b.path());
    }
}
