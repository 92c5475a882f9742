//! Service configuration.
//!
//! Loaded from a YAML file (see `config/imagery.yaml`). Every field has a
//! default so a partial file is valid. The orchestrator never reads this
//! directly; it receives a [`PipelineConfig`] built from it.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use imagery_common::Crs;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::product::ProductSpec;

/// Root configuration loaded from YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub product: ProductConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub pipeline: RunConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Upstream product selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductConfig {
    /// GOES satellite number (16, 18, 19)
    #[serde(default = "default_satellite")]
    pub satellite: u8,
    /// Product family without the domain letter, e.g. "ABI-L1b-Rad"
    #[serde(default = "default_product")]
    pub product: String,
    /// Scan domain: "F" (full disk), "C" (CONUS), "M1"/"M2" (mesoscale)
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default)]
    pub dataset: DatasetConfig,
    /// How many hour directories before the reference hour to search
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u32,
}

fn default_satellite() -> u8 {
    16
}

fn default_product() -> String {
    "ABI-L1b-Rad".to_string()
}

fn default_domain() -> String {
    "C".to_string()
}

fn default_lookback_hours() -> u32 {
    2
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            satellite: default_satellite(),
            product: default_product(),
            domain: default_domain(),
            dataset: DatasetConfig::default(),
            lookback_hours: default_lookback_hours(),
        }
    }
}

/// The named dataset to decode and the ABI channels it is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    pub channels: Vec<u8>,
}

impl Default for DatasetConfig {
    /// Clean longwave infrared window
    fn default() -> Self {
        Self {
            name: "C13".to_string(),
            channels: vec![13],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Raw product files, named by their upstream key
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Finished display artifacts, served by filename
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
    /// Per-run intermediates
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./data/raw")
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("./data/artifacts")
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("./data/work")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            artifacts_dir: default_artifacts_dir(),
            work_dir: default_work_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Target CRS code (EPSG:3857 or EPSG:4326)
    #[serde(default = "default_crs")]
    pub crs: String,
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_crs() -> String {
    "EPSG:3857".to_string()
}

fn default_format() -> String {
    "png".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            crs: default_crs(),
            format: default_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default = "default_region")]
    pub region: String,
    /// Override for the S3 endpoint (e.g. a local mirror)
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Deadline for one pipeline invocation, enforced by the caller
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8085
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl ServiceConfig {
    /// Load and validate a YAML config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        info!(path = %path.display(), "Loaded service config");
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: ServiceConfig = serde_yaml::from_str(content)?;
        config.pipeline_config()?;
        Ok(config)
    }

    /// Build the orchestrator's configuration.
    pub fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let target_crs = Crs::from_code(&self.output.crs)?;
        if !self.output.format.eq_ignore_ascii_case("png") {
            bail!("Unsupported output format {}", self.output.format);
        }
        let dataset = &self.product.dataset;
        if dataset.channels.is_empty() {
            bail!("Dataset {} lists no channels", dataset.name);
        }
        if let Some(ch) = dataset.channels.iter().find(|&&c| !(1..=16).contains(&c)) {
            bail!("ABI channel {} out of range 1-16", ch);
        }

        Ok(PipelineConfig {
            product: ProductSpec {
                satellite: self.product.satellite,
                product: self.product.product.clone(),
                domain: self.product.domain.clone(),
                channels: dataset.channels.clone(),
            },
            dataset: dataset.clone(),
            lookback_hours: self.product.lookback_hours,
            target_crs,
            download_dir: self.storage.download_dir.clone(),
            artifacts_dir: self.storage.artifacts_dir.clone(),
            work_dir: self.storage.work_dir.clone(),
        })
    }
}

/// Everything a pipeline orchestrator needs, passed in at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub product: ProductSpec,
    pub dataset: DatasetConfig,
    pub lookback_hours: u32,
    pub target_crs: Crs,
    pub download_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub work_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config = ServiceConfig::from_yaml("{}").unwrap();
        let pipeline = config.pipeline_config().unwrap();
        assert_eq!(pipeline.product.satellite, 16);
        assert_eq!(pipeline.product.file_token(), "ABI-L1b-RadC");
        assert_eq!(pipeline.dataset.channels, vec![13]);
        assert_eq!(pipeline.target_crs, Crs::WebMercator);
        assert_eq!(config.server.port, 8085);
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
product:
  satellite: 18
  product: ABI-L1b-Rad
  domain: F
  lookback_hours: 4
  dataset:
    name: true_color
    channels: [1, 2, 3]
storage:
  download_dir: /data/raw
  artifacts_dir: /data/artifacts
  work_dir: /data/work
output:
  crs: EPSG:4326
archive:
  endpoint: http://localhost:9000
pipeline:
  timeout_secs: 60
server:
  port: 9090
"#;
        let config = ServiceConfig::from_yaml(yaml).unwrap();
        let pipeline = config.pipeline_config().unwrap();
        assert_eq!(pipeline.product.bucket(), "noaa-goes18");
        assert_eq!(pipeline.dataset.channels, vec![1, 2, 3]);
        assert_eq!(pipeline.lookback_hours, 4);
        assert_eq!(pipeline.target_crs, Crs::Geographic);
        assert_eq!(pipeline.work_dir, PathBuf::from("/data/work"));
        assert_eq!(config.archive.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(config.pipeline.timeout_secs, 60);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ServiceConfig::from_yaml("output:\n  crs: EPSG:5070\n").is_err());
        assert!(ServiceConfig::from_yaml("output:\n  format: jpeg\n").is_err());
        assert!(ServiceConfig::from_yaml("product:\n  dataset:\n    name: x\n    channels: []\n").is_err());
        assert!(ServiceConfig::from_yaml("product:\n  dataset:\n    name: x\n    channels: [17]\n").is_err());
    }
}
