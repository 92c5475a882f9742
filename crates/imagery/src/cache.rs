//! Artifact Cache.
//!
//! The artifacts directory is the single authority for "already done": a
//! name exists there only once its file is complete. Files arrive by rename
//! from a staged copy, never by writing in place. The cache does no locking;
//! callers serialize producers with a [`ClaimTable`](crate::claims::ClaimTable).

use std::io;
use std::path::{Path, PathBuf};

use imagery_common::ArtifactName;
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ArtifactCache {
    root: PathBuf,
}

impl ArtifactCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, name: &ArtifactName) -> PathBuf {
        self.root.join(name.as_str())
    }

    pub async fn exists(&self, name: &ArtifactName) -> bool {
        fs::try_exists(self.path_for(name)).await.unwrap_or(false)
    }

    /// Move a fully written file into the cache under `name`.
    ///
    /// The staged file is synced first, then renamed. When `staged` is on a
    /// different filesystem it is copied to a hidden temporary in the cache
    /// directory and renamed from there, so `name` never refers to a
    /// truncated file.
    pub async fn publish(&self, staged: &Path, name: &ArtifactName) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.root).await?;
        fs::File::open(staged).await?.sync_all().await?;

        let dest = self.path_for(name);
        if let Err(e) = fs::rename(staged, &dest).await {
            debug!(error = %e, "Rename into cache failed, copying");
            let temp = self
                .root
                .join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()));
            copy_into_place(staged, &temp, &dest).await?;
            fs::remove_file(staged).await?;
        }
        Ok(dest)
    }

    /// Artifact names present in the cache, newest acquisition first.
    pub async fn list(&self) -> io::Result<Vec<ArtifactName>> {
        let mut names = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e),
        };

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            match file_name.to_str().and_then(ArtifactName::parse) {
                Some(name) => names.push(name),
                None => warn!(file = ?file_name, "Ignoring unexpected file in artifacts directory"),
            }
        }

        names.sort_by(|a, b| b.cmp(a));
        Ok(names)
    }
}

/// Copy `from` to `temp`, sync it and rename it to `to`.
///
/// `temp` must be on the same filesystem as `to`. It is removed on any
/// failure, so only a complete file ever appears next to `to`.
pub(crate) async fn copy_into_place(from: &Path, temp: &Path, to: &Path) -> io::Result<()> {
    let result = async {
        fs::copy(from, temp).await?;
        fs::File::open(temp).await?.sync_all().await?;
        fs::rename(temp, to).await
    }
    .await;

    if let Err(e) = &result {
        match fs::remove_file(temp).await {
            Ok(()) => debug!(path = %temp.display(), error = %e, "Removed incomplete copy"),
            Err(rm) if rm.kind() == io::ErrorKind::NotFound => {}
            Err(rm) => warn!(path = %temp.display(), error = %rm, "Failed to remove incomplete copy"),
        }
    }
    result
}
