//! Pipeline Orchestrator.
//!
//! Drives one invocation through an explicit state machine. Every stage
//! hands its output to the next by value; the run context owns the claim
//! and the scratch directory, so leaving the machine by any path (done,
//! failed, or the future being dropped) deletes the run's intermediates and
//! releases the claim. A dropped run releases the claim only after its
//! in-progress blocking stage has returned.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use imagery_common::{ArtifactName, DecodedScene, ReprojectedRaster};
use serde::Serialize;
use tokio::task::JoinError;
use tracing::{debug, error, info, instrument};

use crate::archive::ArchiveClient;
use crate::cache::ArtifactCache;
use crate::claims::{ClaimGuard, ClaimTable};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::fetcher::ProductFetcher;
use crate::metrics;
use crate::request::ImageRequest;
use crate::scratch::ScratchDir;
use crate::stages::{
    AbiSceneDecoder, BilinearReprojector, DisplayEncoder, PngDisplayEncoder, Reprojector,
    SceneDecoder,
};

/// Externally visible pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Listing,
    CacheHit,
    Decoding,
    Reprojecting,
    Encoding,
    Cached,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Idle => "idle",
            PipelineState::Listing => "listing",
            PipelineState::CacheHit => "cache_hit",
            PipelineState::Decoding => "decoding",
            PipelineState::Reprojecting => "reprojecting",
            PipelineState::Encoding => "encoding",
            PipelineState::Cached => "cached",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A finished display artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: ArtifactName,
    pub path: PathBuf,
    /// Answered from the cache without running any stage
    pub cache_hit: bool,
}

/// Outcome of one invocation and the states it passed through.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: Result<Artifact>,
    pub visited: Vec<PipelineState>,
}

/// Resources held by a run that has to do real work.
///
/// Field order is drop order: intermediates go before the claim is released.
/// Every blocking stage task holds its own reference to the claim, so an
/// abandoned run keeps the name claimed until that task has finished.
struct RunContext {
    name: ArtifactName,
    files: Vec<PathBuf>,
    scratch: ScratchDir,
    claim: Arc<ClaimGuard>,
}

enum Stage {
    Listing,
    CacheHit(Artifact),
    Decoding(RunContext),
    Reprojecting(RunContext, DecodedScene),
    Encoding(RunContext, ReprojectedRaster),
    Cached(RunContext, PathBuf),
    Done(Artifact),
    Failed(PipelineError),
}

impl Stage {
    fn state(&self) -> PipelineState {
        match self {
            Stage::Listing => PipelineState::Listing,
            Stage::CacheHit(_) => PipelineState::CacheHit,
            Stage::Decoding(_) => PipelineState::Decoding,
            Stage::Reprojecting(..) => PipelineState::Reprojecting,
            Stage::Encoding(..) => PipelineState::Encoding,
            Stage::Cached(..) => PipelineState::Cached,
            Stage::Done(_) => PipelineState::Done,
            Stage::Failed(_) => PipelineState::Failed,
        }
    }
}

/// Result of the listing stage.
enum Listed {
    Hit(Artifact),
    Work(RunContext),
}

pub struct Orchestrator {
    config: PipelineConfig,
    fetcher: ProductFetcher,
    cache: ArtifactCache,
    claims: ClaimTable,
    decoder: Arc<dyn SceneDecoder>,
    reprojector: Arc<dyn Reprojector>,
    encoder: Arc<dyn DisplayEncoder>,
}

impl Orchestrator {
    /// Orchestrator with the production NetCDF, warp and PNG stages.
    pub fn new(config: PipelineConfig, archive: Arc<dyn ArchiveClient>) -> Self {
        let fetcher = ProductFetcher::new(
            archive,
            config.product.clone(),
            config.download_dir.clone(),
            config.lookback_hours,
        );
        Self {
            cache: ArtifactCache::new(config.artifacts_dir.clone()),
            claims: ClaimTable::new(),
            fetcher,
            config,
            decoder: Arc::new(AbiSceneDecoder),
            reprojector: Arc::new(BilinearReprojector),
            encoder: Arc::new(PngDisplayEncoder),
        }
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn SceneDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_reprojector(mut self, reprojector: Arc<dyn Reprojector>) -> Self {
        self.reprojector = reprojector;
        self
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn DisplayEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    pub fn claims(&self) -> &ClaimTable {
        &self.claims
    }

    /// Run the pipeline and return only its outcome.
    pub async fn latest(&self, request: ImageRequest) -> Result<Artifact> {
        self.run(request).await.outcome
    }

    /// Run the pipeline for `request`.
    #[instrument(skip_all, fields(request = %request))]
    pub async fn run(&self, request: ImageRequest) -> RunReport {
        let mut visited = vec![PipelineState::Idle];
        let mut stage = Stage::Listing;

        loop {
            visited.push(stage.state());
            stage = match stage {
                Stage::Listing => match self.list(request).await {
                    Ok(Listed::Hit(artifact)) => Stage::CacheHit(artifact),
                    Ok(Listed::Work(ctx)) => Stage::Decoding(ctx),
                    Err(e) => Stage::Failed(e),
                },
                Stage::CacheHit(artifact) => {
                    metrics::record_cache_hit();
                    info!(artifact = %artifact.name, "Artifact already cached");
                    Stage::Done(artifact)
                }
                Stage::Decoding(ctx) => match self.decode(&ctx).await {
                    Ok(scene) => Stage::Reprojecting(ctx, scene),
                    Err(e) => Stage::Failed(e),
                },
                Stage::Reprojecting(ctx, scene) => match self.reproject(&ctx, scene).await {
                    Ok(raster) => Stage::Encoding(ctx, raster),
                    Err(e) => Stage::Failed(e),
                },
                Stage::Encoding(ctx, raster) => match self.encode(&ctx, raster).await {
                    Ok(staged) => Stage::Cached(ctx, staged),
                    Err(e) => Stage::Failed(e),
                },
                Stage::Cached(ctx, staged) => match self.cache.publish(&staged, &ctx.name).await {
                    Ok(path) => {
                        info!(artifact = %ctx.name, path = %path.display(), "Artifact cached");
                        Stage::Done(Artifact {
                            name: ctx.name.clone(),
                            path,
                            cache_hit: false,
                        })
                    }
                    Err(e) => Stage::Failed(PipelineError::Cache(format!(
                        "publishing {}: {}",
                        ctx.name, e
                    ))),
                },
                Stage::Done(artifact) => {
                    metrics::record_run(if artifact.cache_hit { "hit" } else { "produced" });
                    return RunReport {
                        outcome: Ok(artifact),
                        visited,
                    };
                }
                Stage::Failed(e) => {
                    if e.is_not_yet_available() {
                        info!(reason = %e, "Imagery not yet available");
                    } else {
                        error!(error = %e, stage = e.kind(), "Pipeline run failed");
                    }
                    metrics::record_run(if e.is_not_yet_available() {
                        "not_available"
                    } else {
                        "failed"
                    });
                    return RunReport {
                        outcome: Err(e),
                        visited,
                    };
                }
            };
        }
    }

    /// List upstream, derive the artifact name, and either hit the cache or
    /// claim the name and materialize the raw files.
    async fn list(&self, request: ImageRequest) -> Result<Listed> {
        let started = Instant::now();
        let reference = request.reference_time(Utc::now());
        let product = self.fetcher.latest(reference).await?;

        let name = ArtifactName::for_acquisition(
            product.acquired,
            self.config.target_crs.projection_tag(),
            self.encoder.extension(),
        );
        if let Some(hit) = self.cached(&name).await {
            return Ok(Listed::Hit(hit));
        }

        let claim = self.claims.claim(&name).await;
        // The previous holder may have produced it while we waited
        if let Some(hit) = self.cached(&name).await {
            debug!(artifact = %name, contended = claim.was_contended(), "Artifact appeared while waiting");
            return Ok(Listed::Hit(hit));
        }

        let scratch = ScratchDir::create(&self.config.work_dir, name.stem())
            .await
            .map_err(|e| PipelineError::Cache(format!("creating scratch directory: {}", e)))?;
        let files = self.fetcher.materialize(&product, scratch.path()).await?;
        metrics::record_stage("listing", started.elapsed());

        Ok(Listed::Work(RunContext {
            name,
            files,
            scratch,
            claim: Arc::new(claim),
        }))
    }

    async fn cached(&self, name: &ArtifactName) -> Option<Artifact> {
        if self.cache.exists(name).await {
            Some(Artifact {
                name: name.clone(),
                path: self.cache.path_for(name),
                cache_hit: true,
            })
        } else {
            None
        }
    }

    async fn decode(&self, ctx: &RunContext) -> Result<DecodedScene> {
        let decoder = Arc::clone(&self.decoder);
        let files = ctx.files.clone();
        let dataset = self.config.dataset.clone();
        let claim = Arc::clone(&ctx.claim);

        let started = Instant::now();
        let scene = tokio::task::spawn_blocking(move || {
            let _claim = claim;
            decoder.decode(&files, &dataset)
        })
            .await
            .map_err(|e| PipelineError::Decode(panicked("decoder", e)))?
            .map_err(|e| PipelineError::Decode(format!("{:#}", e)))?;
        metrics::record_stage("decode", started.elapsed());

        debug!(
            dataset = %scene.name,
            width = scene.width,
            height = scene.height,
            bands = scene.band_count(),
            "Decoded scene"
        );
        Ok(scene)
    }

    async fn reproject(&self, ctx: &RunContext, scene: DecodedScene) -> Result<ReprojectedRaster> {
        let reprojector = Arc::clone(&self.reprojector);
        let target = self.config.target_crs.clone();
        let bands = scene.band_count();
        let claim = Arc::clone(&ctx.claim);

        let started = Instant::now();
        let raster = tokio::task::spawn_blocking(move || {
            let _claim = claim;
            reprojector.reproject(scene, &target)
        })
            .await
            .map_err(|e| PipelineError::Reproject(panicked("reprojector", e)))?
            .map_err(|e| PipelineError::Reproject(format!("{:#}", e)))?;
        metrics::record_stage("reproject", started.elapsed());

        if raster.band_count() != bands {
            return Err(PipelineError::Reproject(format!(
                "band count changed from {} to {}",
                bands,
                raster.band_count()
            )));
        }
        debug!(width = raster.width, height = raster.height, "Reprojected raster");
        Ok(raster)
    }

    /// Encode into a staged file inside the run's scratch directory.
    async fn encode(&self, ctx: &RunContext, raster: ReprojectedRaster) -> Result<PathBuf> {
        let encoder = Arc::clone(&self.encoder);
        let claim = Arc::clone(&ctx.claim);

        let started = Instant::now();
        let bytes = tokio::task::spawn_blocking(move || {
            let _claim = claim;
            encoder.encode(&raster)
        })
            .await
            .map_err(|e| PipelineError::Encode(panicked("encoder", e)))?
            .map_err(|e| PipelineError::Encode(format!("{:#}", e)))?;
        metrics::record_stage("encode", started.elapsed());

        let staged = ctx.scratch.join(ctx.name.as_str());
        tokio::fs::write(&staged, &bytes)
            .await
            .map_err(|e| PipelineError::Cache(format!("staging {}: {}", staged.display(), e)))?;
        debug!(path = %staged.display(), bytes = bytes.len(), "Staged artifact");
        Ok(staged)
    }
}

fn panicked(stage: &str, e: JoinError) -> String {
    if e.is_panic() {
        format!("{} panicked", stage)
    } else {
        format!("{} task cancelled", stage)
    }
}
