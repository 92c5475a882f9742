//! GOES product identity and archive naming.
//!
//! NOAA's public buckets lay ABI files out as
//! `<product><domain letter>/<YYYY>/<DDD>/<HH>/<file>` where the file name is
//!
//! ```text
//! OR_ABI-L1b-RadC-M6C13_G16_s20251082212150_e20251082214523_c20251082214570.nc
//!    └── token ─┘ mode ch  sat  └─ scan start (YYYYDDDHHMMSSt) ─┘
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use imagery_common::parse_abi_timestamp;
use serde::{Deserialize, Serialize};

/// What to look for upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSpec {
    pub satellite: u8,
    /// Product family without domain, e.g. "ABI-L1b-Rad"
    pub product: String,
    /// "F", "C", "M1" or "M2"
    pub domain: String,
    pub channels: Vec<u8>,
}

impl ProductSpec {
    pub fn bucket(&self) -> String {
        format!("noaa-goes{}", self.satellite)
    }

    /// Top-level archive directory. Both mesoscale sectors share `...M`.
    pub fn directory_product(&self) -> String {
        let letter = self.domain.chars().next().map(String::from).unwrap_or_default();
        format!("{}{}", self.product, letter)
    }

    /// Product token as it appears in file names, e.g. `ABI-L1b-RadM1`.
    pub fn file_token(&self) -> String {
        format!("{}{}", self.product, self.domain)
    }

    /// Listing prefix for the hour directory containing `t`.
    pub fn hour_prefix(&self, t: DateTime<Utc>) -> String {
        format!("{}/{}/", self.directory_product(), t.format("%Y/%j/%H"))
    }

    /// Whether a parsed file belongs to this product and one of its channels.
    pub fn matches(&self, file: &AbiFileName) -> bool {
        file.product_token == self.file_token()
            && file.satellite == self.satellite
            && self.channels.contains(&file.channel)
    }
}

/// Fields parsed from an ABI file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiFileName {
    pub product_token: String,
    pub mode: u8,
    pub channel: u8,
    pub satellite: u8,
    pub start: DateTime<Utc>,
}

impl AbiFileName {
    /// Parse a bare file name or a full archive key.
    ///
    /// Returns `None` for anything that is not a per-channel ABI file.
    pub fn parse(key: &str) -> Option<Self> {
        let name = key.rsplit('/').next()?;
        let stem = name.strip_prefix("OR_")?.strip_suffix(".nc")?;
        let mut parts = stem.split('_');

        let (product_token, mode_channel) = parts.next()?.rsplit_once('-')?;
        let (mode, channel) = mode_channel.strip_prefix('M')?.split_once('C')?;
        let satellite = parts.next()?.strip_prefix('G')?.parse().ok()?;
        let start = parse_abi_timestamp(parts.next()?.strip_prefix('s')?).ok()?;

        Some(Self {
            product_token: product_token.to_string(),
            mode: mode.parse().ok()?,
            channel: channel.parse().ok()?,
            satellite,
            start,
        })
    }
}

/// One raw file in the upstream archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFile {
    pub bucket: String,
    pub key: String,
    pub channel: u8,
}

impl RawFile {
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    /// Deterministic local location, used to skip re-downloads.
    pub fn local_path(&self, download_root: &Path) -> PathBuf {
        download_root.join(&self.bucket).join(&self.key)
    }
}

/// One acquisition: every configured channel of a single scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageryProduct {
    pub satellite: u8,
    pub product: String,
    pub domain: String,
    /// Scan start; the artifact name is derived from this alone
    pub acquired: DateTime<Utc>,
    /// Ordered as the dataset's channel list
    pub files: Vec<RawFile>,
}
