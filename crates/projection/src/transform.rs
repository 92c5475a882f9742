//! CRS-to-CRS point transformation.
//!
//! Every projection goes through geographic longitude/latitude, which is
//! accurate enough for display imagery and keeps each projection small.

use imagery_common::Crs;

use crate::geostationary::Geostationary;
use crate::mercator::WebMercator;

/// Forward and inverse mapping between lon/lat degrees and projected units.
pub trait Projection: Send + Sync {
    /// Geographic (lon, lat) to projected (x, y); `None` if not representable.
    fn project(&self, lon: f64, lat: f64) -> Option<(f64, f64)>;

    /// Projected (x, y) to geographic (lon, lat); `None` if off the globe.
    fn unproject(&self, x: f64, y: f64) -> Option<(f64, f64)>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Geographic;

impl Projection for Geographic {
    fn project(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        ((-90.0..=90.0).contains(&lat) && lon.is_finite()).then_some((lon, lat))
    }

    fn unproject(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        self.project(x, y)
    }
}

pub fn for_crs(crs: &Crs) -> Box<dyn Projection> {
    match crs {
        Crs::Geographic => Box::new(Geographic),
        Crs::WebMercator => Box::new(WebMercator),
        Crs::Geostationary(params) => Box::new(Geostationary::new(params)),
    }
}

/// Transforms points from a source CRS into a destination CRS.
pub struct CrsTransform {
    src: Box<dyn Projection>,
    dst: Box<dyn Projection>,
}

impl CrsTransform {
    pub fn new(src: &Crs, dst: &Crs) -> Self {
        Self {
            src: for_crs(src),
            dst: for_crs(dst),
        }
    }

    /// Source coordinates to destination coordinates.
    #[inline]
    pub fn forward(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let (lon, lat) = self.src.unproject(x, y)?;
        self.dst.project(lon, lat)
    }

    /// Destination coordinates back to source coordinates.
    #[inline]
    pub fn backward(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let (lon, lat) = self.dst.unproject(x, y)?;
        self.src.project(lon, lat)
    }
}
