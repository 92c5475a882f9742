use thiserror::Error;

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Raster has no valid pixels")]
    NoValidPixels,

    #[error("Cannot compose {0} bands into an image (expected 1 to 4)")]
    UnsupportedBandCount(usize),

    #[error("Pixel buffer has {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("Image dimensions {width}x{height} are invalid for PNG")]
    InvalidDimensions { width: usize, height: usize },

    #[error("IDAT compression failed: {0}")]
    Compression(#[from] std::io::Error),
}
