//! Common types shared by the satellite imagery crates.

pub mod artifact;
pub mod crs;
pub mod error;
pub mod raster;
pub mod time;
pub mod transform;

pub use artifact::ArtifactName;
pub use crs::{Crs, CrsParseError, GeostationaryParams};
pub use error::{RasterError, RasterResult};
pub use raster::{DecodedScene, Raster, ReprojectedRaster};
pub use time::{parse_abi_timestamp, parse_request_time, TimeParseError};
pub use transform::GeoTransform;
