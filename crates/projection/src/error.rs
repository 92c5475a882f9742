//! Error types for projection and warping.

use imagery_common::RasterError;
use thiserror::Error;

pub type ProjectionResult<T> = Result<T, ProjectionError>;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Source transform is not invertible")]
    SingularTransform,

    #[error("No part of the source footprint is representable in {0}")]
    NoValidSamples(String),

    #[error("Output grid {width}x{height} exceeds the {max} pixel limit per side")]
    OutputTooLarge {
        width: usize,
        height: usize,
        max: usize,
    },

    #[error(transparent)]
    Raster(#[from] RasterError),
}
