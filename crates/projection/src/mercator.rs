//! Spherical Web Mercator (EPSG:3857).

use std::f64::consts::FRAC_PI_4;

use crate::transform::Projection;

/// Sphere radius used by EPSG:3857 (WGS84 semi-major axis).
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude at which the square Web Mercator world ends.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercator;

impl Projection for WebMercator {
    fn project(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if !lon.is_finite() || !lat.is_finite() {
            return None;
        }
        let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = EARTH_RADIUS * lon.to_radians();
        let y = EARTH_RADIUS * (FRAC_PI_4 + lat / 2.0).tan().ln();
        Some((x, y))
    }

    fn unproject(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let lon = (x / EARTH_RADIUS).to_degrees();
        let lat = (y / EARTH_RADIUS).sinh().atan().to_degrees();
        Some((lon, lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin() {
        assert_eq!(WebMercator.project(0.0, 0.0), Some((0.0, 0.0)));
    }

    #[test]
    fn test_world_extent() {
        let (x, y) = WebMercator.project(180.0, MAX_LATITUDE).unwrap();
        assert!((x - 20_037_508.342_789_244).abs() < 1e-6);
        assert!((y - 20_037_508.342_789_244).abs() < 1e-3);
    }

    #[test]
    fn test_roundtrip() {
        let (x, y) = WebMercator.project(-95.5, 38.25).unwrap();
        let (lon, lat) = WebMercator.unproject(x, y).unwrap();
        assert!((lon + 95.5).abs() < 1e-9);
        assert!((lat - 38.25).abs() < 1e-9);
    }

    #[test]
    fn test_poles_clamped() {
        let (_, y) = WebMercator.project(0.0, 90.0).unwrap();
        assert!(y.is_finite());
    }
}
