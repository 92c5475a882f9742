//! Per-run intermediate directories.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// A private directory under the work root, removed with everything in it
/// when dropped. Dropping happens on success, on failure and when a run's
/// future is abandoned.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create `<work_dir>/<stem>.<uuid>`.
    pub async fn create(work_dir: &Path, stem: &str) -> io::Result<Self> {
        let path = work_dir.join(format!("{}.{}", stem, uuid::Uuid::new_v4().simple()));
        tokio::fs::create_dir_all(&path).await?;
        debug!(path = %path.display(), "Created scratch directory");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed scratch directory"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove scratch directory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_removed_on_drop() {
        let work = TempDir::new().unwrap();
        let scratch = ScratchDir::create(work.path(), "20250405_123000_merc")
            .await
            .unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.starts_with(work.path()));
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("20250405_123000_merc.")));

        std::fs::write(scratch.join("a.partial"), b"half").unwrap();
        drop(scratch);

        assert!(!path.exists());
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unique_per_run() {
        let work = TempDir::new().unwrap();
        let a = ScratchDir::create(work.path(), "x").await.unwrap();
        let b = ScratchDir::create(work.path(), "x").await.unwrap();
        assert_ne!(a.path(), b.path());
    }
}
