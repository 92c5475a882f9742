//! Coordinate Reference System types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameters of a geostationary satellite view.
///
/// Matches the `goes_imager_projection` variable carried by GOES-R ABI files.
/// Projected coordinates are scan angles multiplied by
/// `perspective_point_height`, in metres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeostationaryParams {
    /// Satellite height above the ellipsoid surface (meters)
    pub perspective_point_height: f64,
    /// Semi-major axis of Earth ellipsoid (meters)
    pub semi_major_axis: f64,
    /// Semi-minor axis of Earth ellipsoid (meters)
    pub semi_minor_axis: f64,
    /// Longitude of satellite nadir point (degrees)
    pub longitude_origin: f64,
    /// True when the sweep angle axis is "x" (GOES-R); false for "y" (Meteosat, Himawari)
    pub sweep_x: bool,
}

impl Default for GeostationaryParams {
    fn default() -> Self {
        // GOES-East operational position
        Self {
            perspective_point_height: 35_786_023.0,
            semi_major_axis: 6_378_137.0,
            semi_minor_axis: 6_356_752.31414,
            longitude_origin: -75.0,
            sweep_x: true,
        }
    }
}

impl GeostationaryParams {
    /// GOES-West operational position (137.2°W).
    pub fn goes_west() -> Self {
        Self {
            longitude_origin: -137.2,
            ..Default::default()
        }
    }
}

/// Coordinate reference system of a raster.
#[derive(Debug, Clone, PartialEq)]
pub enum Crs {
    /// WGS84 longitude/latitude in degrees (EPSG:4326)
    Geographic,
    /// Spherical Web Mercator in metres (EPSG:3857)
    WebMercator,
    /// Native satellite view
    Geostationary(GeostationaryParams),
}

impl Crs {
    /// Parse an authority code such as `EPSG:3857`.
    ///
    /// Only the output projections are addressable by code; the geostationary
    /// CRS always comes from file metadata.
    pub fn from_code(s: &str) -> Result<Self, CrsParseError> {
        match s.trim().to_uppercase().as_str() {
            "EPSG:4326" | "CRS:84" => Ok(Crs::Geographic),
            "EPSG:3857" | "EPSG:900913" => Ok(Crs::WebMercator),
            _ => Err(CrsParseError::UnsupportedCrs(s.to_string())),
        }
    }

    /// Short tag used in artifact filenames.
    pub fn projection_tag(&self) -> &'static str {
        match self {
            Crs::Geographic => "latlon",
            Crs::WebMercator => "merc",
            Crs::Geostationary(_) => "geos",
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Geographic)
    }
}

impl FromStr for Crs {
    type Err = CrsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Crs::from_code(s)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Geographic => write!(f, "EPSG:4326"),
            Crs::WebMercator => write!(f, "EPSG:3857"),
            Crs::Geostationary(p) => write!(
                f,
                "+proj=geos +h={} +lon_0={} +sweep={}",
                p.perspective_point_height,
                p.longitude_origin,
                if p.sweep_x { "x" } else { "y" }
            ),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes() {
        assert_eq!(Crs::from_code("EPSG:3857").unwrap(), Crs::WebMercator);
        assert_eq!(Crs::from_code("epsg:900913").unwrap(), Crs::WebMercator);
        assert_eq!(Crs::from_code("CRS:84").unwrap(), Crs::Geographic);
        assert!(Crs::from_code("EPSG:5070").is_err());
    }

    #[test]
    fn test_projection_tags() {
        assert_eq!(Crs::WebMercator.projection_tag(), "merc");
        assert_eq!(Crs::Geographic.projection_tag(), "latlon");
        assert_eq!(
            Crs::Geostationary(GeostationaryParams::default()).projection_tag(),
            "geos"
        );
    }

    #[test]
    fn test_display_roundtrip() {
        for crs in [Crs::WebMercator, Crs::Geographic] {
            assert_eq!(crs.to_string().parse::<Crs>().unwrap(), crs);
        }
    }

    #[test]
    fn test_params_deserialize() {
        let yaml = "perspective_point_height: 35786023.0\nsemi_major_axis: 6378137.0\nsemi_minor_axis: 6356752.31414\nlongitude_origin: -137.2\nsweep_x: true\n";
        let params: GeostationaryParams = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(params, GeostationaryParams::goes_west());
    }
}
