//! Error types for raster construction.

use thiserror::Error;

/// Result type alias using RasterError.
pub type RasterResult<T> = Result<T, RasterError>;

/// Errors raised when assembling a raster from parts.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Raster has zero width or height ({width}x{height})")]
    EmptyGrid { width: usize, height: usize },

    #[error("Band {band} has {actual} values, expected {expected}")]
    BandLength {
        band: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Raster has no bands")]
    NoBands,
}
