//! Satellite imagery acquisition-and-caching pipeline.
//!
//! Fetches the newest GOES ABI scan for a configured product, decodes one
//! dataset, warps it into a web-mapping projection, encodes a PNG and keeps
//! the result in an on-disk artifact cache keyed by acquisition time.
//!
//! ```text
//! Idle ─► Listing ─┬─► CacheHit ─────────────────────────────────────┬─► Done
//!                  └─► Decoding ─► Reprojecting ─► Encoding ─► Cached ┘
//!                        (any stage error) ─► Failed
//! ```

pub mod archive;
pub mod cache;
pub mod claims;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod orchestrator;
pub mod product;
pub mod request;
pub mod scratch;
pub mod stages;

pub use archive::{ArchiveClient, S3Archive};
pub use cache::ArtifactCache;
pub use claims::{ClaimGuard, ClaimStats, ClaimTable};
pub use config::{DatasetConfig, PipelineConfig, ServiceConfig};
pub use error::{PipelineError, Result};
pub use fetcher::ProductFetcher;
pub use orchestrator::{Artifact, Orchestrator, PipelineState, RunReport};
pub use product::{AbiFileName, ImageryProduct, ProductSpec, RawFile};
pub use request::ImageRequest;
pub use scratch::ScratchDir;
pub use stages::{
    AbiSceneDecoder, BilinearReprojector, DisplayEncoder, PngDisplayEncoder, Reprojector,
    SceneDecoder,
};
