use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};

const SCRATCH_PREFIX: &str = "backup-tui-";

/// Process-lifetime directory under the system temp root that holds the
/// produced archives. Removal happens at most once.
#[derive(Debug)]
pub(crate) struct ScratchDir {
    path: PathBuf,
    removed: AtomicBool,
}

impl ScratchDir {
    pub(crate) fn create() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir()
            .context("create scratch dir")?;
        Ok(Self {
            path: dir.keep(),
            removed: AtomicBool::new(false),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    pub(crate) fn is_removed(&self) -> bool {
        self.removed.load(Ordering::SeqCst)
    }

    /// Returns `Ok(true)` only for the call that actually deleted the tree.
    pub(crate) fn remove(&self) -> Result<bool> {
        if self.removed.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }
        match fs::remove_dir_all(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => {
                Err(err).with_context(|| format!("remove scratch dir {}", self.path.display()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_makes_a_prefixed_directory() {
        let scratch = ScratchDir::create().unwrap();
        assert!(scratch.path().is_dir());
        let name = scratch.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(SCRATCH_PREFIX));
        scratch.remove().unwrap();
    }

    #[test]
    fn remove_is_idempotent() {
        let scratch = ScratchDir::create().unwrap();
        fs::create_dir(scratch.path().join("nested")).unwrap();
        fs::write(scratch.path().join("nested").join("a.zip"), "data").unwrap();

        assert!(scratch.remove().unwrap());
        assert!(!scratch.path().exists());
        assert!(!scratch.remove().unwrap());
        assert!(scratch.is_removed());
    }

    #[test]
    fn remove_tolerates_directory_already_gone() {
        let scratch = ScratchDir::create().unwrap();
        fs::remove_dir_all(scratch.path()).unwrap();
        assert!(!scratch.remove().unwrap());
    }
}
