//! Raw Product Fetcher.
//!
//! Resolves a reference time to the newest complete scan upstream and
//! materializes its files locally, skipping any already downloaded.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::archive::ArchiveClient;
use crate::cache::copy_into_place;
use crate::error::{PipelineError, Result};
use crate::metrics;
use crate::product::{AbiFileName, ImageryProduct, ProductSpec, RawFile};

pub struct ProductFetcher {
    archive: Arc<dyn ArchiveClient>,
    spec: ProductSpec,
    download_root: PathBuf,
    lookback_hours: u32,
}

impl ProductFetcher {
    pub fn new(
        archive: Arc<dyn ArchiveClient>,
        spec: ProductSpec,
        download_root: PathBuf,
        lookback_hours: u32,
    ) -> Self {
        Self {
            archive,
            spec,
            download_root,
            lookback_hours,
        }
    }

    pub fn spec(&self) -> &ProductSpec {
        &self.spec
    }

    /// Newest scan at or before `reference` for which every channel exists.
    ///
    /// Hour directories are searched newest first, from the one containing
    /// `reference` back `lookback_hours` hours.
    pub async fn latest(&self, reference: DateTime<Utc>) -> Result<ImageryProduct> {
        let bucket = self.spec.bucket();

        for hours_back in 0..=i64::from(self.lookback_hours) {
            let hour = reference - Duration::hours(hours_back);
            let prefix = self.spec.hour_prefix(hour);
            let keys = self
                .archive
                .list(&bucket, &prefix)
                .await
                .map_err(|e| PipelineError::Fetch(format!("listing {}/{}: {:#}", bucket, prefix, e)))?;

            if let Some(product) = self.newest_complete_scan(&bucket, &keys, reference) {
                info!(
                    acquired = %product.acquired,
                    files = product.files.len(),
                    "Found latest acquisition"
                );
                return Ok(product);
            }
            debug!(prefix = %prefix, keys = keys.len(), "No complete scan in hour directory");
        }

        Err(PipelineError::DataNotYetAvailable(format!(
            "no complete {} scan from {} at or before {}",
            self.spec.file_token(),
            bucket,
            reference.format("%Y-%m-%dT%H:%M:%SZ")
        )))
    }

    fn newest_complete_scan(
        &self,
        bucket: &str,
        keys: &[String],
        reference: DateTime<Utc>,
    ) -> Option<ImageryProduct> {
        let mut scans: BTreeMap<DateTime<Utc>, HashMap<u8, &str>> = BTreeMap::new();
        for key in keys {
            let Some(file) = AbiFileName::parse(key) else {
                continue;
            };
            if self.spec.matches(&file) && file.start <= reference {
                scans.entry(file.start).or_default().insert(file.channel, key.as_str());
            }
        }

        scans.into_iter().rev().find_map(|(start, by_channel)| {
            let files = self
                .spec
                .channels
                .iter()
                .map(|ch| {
                    by_channel.get(ch).map(|key| RawFile {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                        channel: *ch,
                    })
                })
                .collect::<Option<Vec<_>>>()?;
            Some(ImageryProduct {
                satellite: self.spec.satellite,
                product: self.spec.product.clone(),
                domain: self.spec.domain.clone(),
                acquired: start,
                files,
            })
        })
    }

    /// Make every file of `product` available locally.
    ///
    /// Existing files are reused. Missing ones are downloaded into `staging`
    /// as `.partial` files and moved into place only once complete.
    #[instrument(skip(self, product, staging), fields(acquired = %product.acquired))]
    pub async fn materialize(&self, product: &ImageryProduct, staging: &Path) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(product.files.len());

        for raw in &product.files {
            let final_path = raw.local_path(&self.download_root);
            if fs::try_exists(&final_path).await.unwrap_or(false) {
                debug!(path = %final_path.display(), "File already exists, skipping download");
                paths.push(final_path);
                continue;
            }

            let temp_path = staging.join(format!("{}.partial", raw.file_name()));
            let bytes = self
                .archive
                .download(&raw.bucket, &raw.key, &temp_path)
                .await
                .map_err(|e| PipelineError::Fetch(format!("downloading {}: {:#}", raw.key, e)))?;

            move_into_place(&temp_path, &final_path)
                .await
                .map_err(|e| PipelineError::Fetch(format!("storing {}: {}", final_path.display(), e)))?;

            metrics::record_download(bytes);
            info!(path = %final_path.display(), bytes, "Download completed");
            paths.push(final_path);
        }

        Ok(paths)
    }
}

/// Rename, falling back to copy + delete across filesystems.
async fn move_into_place(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).await?;
    }
    if fs::rename(from, to).await.is_err() {
        // Copy under a temporary sibling name so the final name only ever
        // refers to a complete file
        let sibling = to.with_extension("partial");
        copy_into_place(from, &sibling, to).await?;
        fs::remove_file(from).await?;
    }
    Ok(())
}
