//! Per-job working directories.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{error, info};

use crate::error::{RegistrationError, RegistrationResult};

const PREFIX: &str = "elxbridge_";

/// Scratch directory owned by one registration or warp job.
///
/// Every job gets a fresh, uniquely named directory. When removal is
/// enabled the directory is deleted on [`finish`](Self::finish) or drop,
/// including on error paths; otherwise it is left on disk for inspection.
#[derive(Debug)]
pub struct WorkingDirectory {
    path: PathBuf,
    temp: Option<TempDir>,
}

impl WorkingDirectory {
    /// Creates a new directory under `parent`, or under the system temp
    /// directory when `parent` is `None`.
    pub fn create(parent: Option<&Path>, remove: bool) -> RegistrationResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX);
        let temp = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent).map_err(|source| RegistrationError::WriteFailed {
                    path: parent.to_path_buf(),
                    source,
                })?;
                builder.tempdir_in(parent)
            }
            None => builder.tempdir(),
        }
        .map_err(|source| RegistrationError::WriteFailed {
            path: parent.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir),
            source,
        })?;

        let path = temp.path().to_path_buf();
        info!("Create Working Directory: {}", path.display());
        let temp = if remove {
            Some(temp)
        } else {
            temp.keep();
            None
        };
        Ok(Self { path, temp })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the directory.
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Ends the job, deleting the directory if removal is enabled.
    ///
    /// Returns the path when the directory was kept.
    pub fn finish(self) -> Option<PathBuf> {
        match self.temp {
            Some(temp) => {
                if let Err(e) = temp.close() {
                    error!("Cleanup of working directory {} failed: {}", self.path.display(), e);
                }
                None
            }
            None => {
                info!("Keeping working directory {}", self.path.display());
                Some(self.path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_on_finish() {
        let parent = tempfile::tempdir().unwrap();
        let dir = WorkingDirectory::create(Some(parent.path()), true).unwrap();
        let path = dir.path().to_path_buf();
        assert!(path.is_dir());
        assert!(path.file_name().unwrap().to_string_lossy().starts_with(PREFIX));
        assert_eq!(dir.finish(), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_kept_when_requested() {
        let parent = tempfile::tempdir().unwrap();
        let dir = WorkingDirectory::create(Some(parent.path()), false).unwrap();
        let path = dir.path().to_path_buf();
        drop(dir);
        assert!(path.is_dir());
    }

    #[test]
    fn test_never_reused() {
        let parent = tempfile::tempdir().unwrap();
        let a = WorkingDirectory::create(Some(parent.path()), true).unwrap();
        let b = WorkingDirectory::create(Some(parent.path()), true).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_creates_missing_parent() {
        let parent = tempfile::tempdir().unwrap();
        let nested = parent.path().join("jobs").join("today");
        let dir = WorkingDirectory::create(Some(&nested), true).unwrap();
        assert!(dir.path().starts_with(&nested));
    }
}
