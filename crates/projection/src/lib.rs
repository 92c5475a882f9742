//! Coordinate reference system transformations and raster warping.
//!
//! Implements the handful of projections the imagery pipeline needs from
//! scratch: the geostationary satellite view, spherical Web Mercator and
//! plain geographic coordinates.

pub mod error;
pub mod geostationary;
pub mod grid;
pub mod interpolation;
pub mod mercator;
pub mod transform;
pub mod warp;

pub use error::{ProjectionError, ProjectionResult};
pub use geostationary::Geostationary;
pub use grid::{suggest_output_grid, OutputGrid};
pub use mercator::WebMercator;
pub use transform::{for_crs, CrsTransform, Projection};
pub use warp::warp_bilinear;
