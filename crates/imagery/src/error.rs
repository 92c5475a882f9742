//! Typed outcomes of a pipeline run.

use thiserror::Error;

/// Errors that end a pipeline run.
///
/// Contention on an artifact claim is not an error: the losing invocation
/// waits for the winner and then takes the cache-hit path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Upstream has no complete acquisition yet; try again later.
    #[error("No data available yet: {0}")]
    DataNotYetAvailable(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Reprojection failed: {0}")]
    Reproject(String),

    #[error("Encode failed: {0}")]
    Encode(String),

    #[error("Artifact cache error: {0}")]
    Cache(String),
}

impl PipelineError {
    /// Expected transient condition rather than a fault.
    pub fn is_not_yet_available(&self) -> bool {
        matches!(self, PipelineError::DataNotYetAvailable(_))
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::DataNotYetAvailable(_) => "not_available",
            PipelineError::Fetch(_) => "fetch",
            PipelineError::Decode(_) => "decode",
            PipelineError::Reproject(_) => "reproject",
            PipelineError::Encode(_) => "encode",
            PipelineError::Cache(_) => "cache",
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
