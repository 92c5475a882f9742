//! Shared fakes for pipeline integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use imagery::{
    ArchiveClient, BilinearReprojector, DatasetConfig, DisplayEncoder, Orchestrator,
    PipelineConfig, PngDisplayEncoder, ProductSpec, Reprojector, SceneDecoder,
};
use imagery_common::{Crs, DecodedScene, GeoTransform, Raster, ReprojectedRaster};
use tempfile::TempDir;

pub const SCAN_KEY: &str = "ABI-L1b-RadC/2025/095/12/OR_ABI-L1b-RadC-M6C13_G16_s20250951230007_e20250951232380_c20250951232431.nc";
pub const SCAN_ARTIFACT: &str = "20250405_123000_merc.png";

/// In-memory archive with call counters.
#[derive(Default)]
pub struct FakeArchive {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_listing: bool,
    pub lists: AtomicUsize,
    pub downloads: AtomicUsize,
}

impl FakeArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys(keys: &[&str]) -> Self {
        let archive = Self::new();
        for key in keys {
            archive.insert(key);
        }
        archive
    }

    pub fn failing() -> Self {
        Self {
            fail_listing: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, key: &str) {
        self.objects
            .lock()
            .unwrap()
            .insert(format!("noaa-goes16/{}", key), format!("contents of {}", key).into_bytes());
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArchiveClient for FakeArchive {
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            bail!("connection reset by peer");
        }
        let full = format!("{}/{}", bucket, prefix);
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(&full))
            .map(|k| k[bucket.len() + 1..].to_string())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let bytes = self
            .objects
            .lock()
            .unwrap()
            .get(&format!("{}/{}", bucket, key))
            .cloned()
            .ok_or_else(|| anyhow!("NoSuchKey: {}", key))?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(bytes.len() as u64)
    }
}

#[derive(Clone, Copy)]
pub enum DecoderMode {
    /// A small geographic raster over the central US
    Valid,
    /// Every pixel missing
    AllMissing,
    /// Reader rejects the files
    Malformed,
}

/// Counting decoder that checks its inputs exist and returns a synthetic scene.
pub struct FakeDecoder {
    mode: DecoderMode,
    delay: Duration,
    pub calls: AtomicUsize,
    live: AtomicUsize,
    /// Most calls ever running at the same time
    pub max_live: AtomicUsize,
}

impl FakeDecoder {
    pub fn new(mode: DecoderMode) -> Self {
        Self {
            mode,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            live: AtomicUsize::new(0),
            max_live: AtomicUsize::new(0),
        }
    }

    pub fn slow(mode: DecoderMode, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(mode)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }
}

impl SceneDecoder for FakeDecoder {
    fn decode(&self, files: &[PathBuf], dataset: &DatasetConfig) -> Result<DecodedScene> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.live.fetch_sub(1, Ordering::SeqCst);

        for file in files {
            if !file.exists() {
                bail!("raw file {} missing", file.display());
            }
        }

        let (w, h) = (16, 12);
        let values: Vec<f32> = match self.mode {
            DecoderMode::Valid => (0..w * h).map(|i| 200.0 + i as f32 * 0.5).collect(),
            DecoderMode::AllMissing => vec![f32::NAN; w * h],
            DecoderMode::Malformed => bail!("NetCDF: Unknown file format"),
        };
        let raster = Raster::new(
            dataset.name.clone(),
            Crs::Geographic,
            GeoTransform::north_up(-100.0, 0.5, 42.0, -0.5),
            w,
            h,
            vec![values; dataset.channels.len()],
        )?;
        Ok(DecodedScene::new(raster))
    }
}

/// Counts calls and delegates to the real warp, or fails every call.
#[derive(Default)]
pub struct CountingReprojector {
    fail: bool,
    pub calls: AtomicUsize,
}

impl CountingReprojector {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl Reprojector for CountingReprojector {
    fn reproject(&self, scene: DecodedScene, target: &Crs) -> Result<ReprojectedRaster> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("output grid of {}x{} exceeds limit", scene.width * 10_000, scene.height);
        }
        BilinearReprojector.reproject(scene, target)
    }
}

/// Counts calls and delegates to the real PNG encoder.
#[derive(Default)]
pub struct CountingEncoder {
    pub calls: AtomicUsize,
}

impl DisplayEncoder for CountingEncoder {
    fn encode(&self, raster: &ReprojectedRaster) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        PngDisplayEncoder.encode(raster)
    }
}

/// An orchestrator over temporary directories with counting fakes.
pub struct Harness {
    pub root: TempDir,
    pub archive: Arc<FakeArchive>,
    pub decoder: Arc<FakeDecoder>,
    pub reprojector: Arc<CountingReprojector>,
    pub encoder: Arc<CountingEncoder>,
    pub orchestrator: Arc<Orchestrator>,
}

impl Harness {
    pub fn new(archive: FakeArchive, decoder: FakeDecoder) -> Self {
        Self::with_channels(archive, decoder, vec![13])
    }

    pub fn with_channels(archive: FakeArchive, decoder: FakeDecoder, channels: Vec<u8>) -> Self {
        Self::build(archive, decoder, CountingReprojector::default(), channels)
    }

    pub fn with_reprojector(
        archive: FakeArchive,
        decoder: FakeDecoder,
        reprojector: CountingReprojector,
    ) -> Self {
        Self::build(archive, decoder, reprojector, vec![13])
    }

    fn build(
        archive: FakeArchive,
        decoder: FakeDecoder,
        reprojector: CountingReprojector,
        channels: Vec<u8>,
    ) -> Self {
        let root = TempDir::new().unwrap();
        let config = pipeline_config(root.path(), channels);

        let archive = Arc::new(archive);
        let decoder = Arc::new(decoder);
        let reprojector = Arc::new(reprojector);
        let encoder = Arc::new(CountingEncoder::default());

        let orchestrator = Orchestrator::new(config, archive.clone())
            .with_decoder(decoder.clone())
            .with_reprojector(reprojector.clone())
            .with_encoder(encoder.clone());

        Self {
            root,
            archive,
            decoder,
            reprojector,
            encoder,
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.root.path().join("artifacts")
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root.path().join("work")
    }

    pub fn download_dir(&self) -> PathBuf {
        self.root.path().join("raw")
    }
}

pub fn pipeline_config(root: &Path, channels: Vec<u8>) -> PipelineConfig {
    PipelineConfig {
        product: ProductSpec {
            satellite: 16,
            product: "ABI-L1b-Rad".to_string(),
            domain: "C".to_string(),
            channels: channels.clone(),
        },
        dataset: DatasetConfig {
            name: "C13".to_string(),
            channels,
        },
        lookback_hours: 2,
        target_crs: Crs::WebMercator,
        download_dir: root.join("raw"),
        artifacts_dir: root.join("artifacts"),
        work_dir: root.join("work"),
    }
}

/// File names in `dir`, sorted; empty when `dir` does not exist.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
