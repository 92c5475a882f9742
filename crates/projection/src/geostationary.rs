//! Geostationary satellite projection.
//!
//! This projection is used for GOES-R series satellite imagery.
//! The satellite views Earth from a fixed position above the equator,
//! and native coordinates are scan angles in radians from nadir. Projected
//! coordinates (as used by the affine transform of a decoded scene) are the
//! scan angles scaled by the perspective point height, in metres.
//!
//! Reference: GOES-R Product Definition and Users' Guide (PUG) Volume 4,
//! Section 4.2.8.

use imagery_common::GeostationaryParams;

use crate::transform::Projection;

#[derive(Debug, Clone)]
pub struct Geostationary {
    /// Distance from Earth centre to satellite (meters)
    h: f64,
    /// Perspective point height above the ellipsoid (meters)
    perspective_point_height: f64,
    /// Semi-major axis (meters)
    req: f64,
    /// Semi-minor axis (meters)
    rpol: f64,
    /// Sub-satellite longitude (radians)
    lambda_0: f64,
    /// GOES-R sweeps along x; Meteosat and Himawari along y
    sweep_x: bool,
}

impl Geostationary {
    pub fn new(params: &GeostationaryParams) -> Self {
        Self {
            h: params.perspective_point_height + params.semi_major_axis,
            perspective_point_height: params.perspective_point_height,
            req: params.semi_major_axis,
            rpol: params.semi_minor_axis,
            lambda_0: params.longitude_origin.to_radians(),
            sweep_x: params.sweep_x,
        }
    }

    /// Ray direction from the satellite for a pair of scan angles.
    ///
    /// The first component points from the satellite towards Earth's centre.
    #[inline]
    fn view_direction(&self, x: f64, y: f64) -> (f64, f64, f64) {
        if self.sweep_x {
            (x.cos() * y.cos(), -x.sin(), x.cos() * y.sin())
        } else {
            (x.cos() * y.cos(), -x.sin() * y.cos(), y.sin())
        }
    }

    /// Convert scan angles (radians) to geographic coordinates (lon/lat degrees).
    ///
    /// Returns `None` if the scan angle points to space.
    pub fn scan_to_geo(&self, x_rad: f64, y_rad: f64) -> Option<(f64, f64)> {
        let (dx, dy, dz) = self.view_direction(x_rad, y_rad);
        let k = (self.req / self.rpol).powi(2);

        // Distance along the ray to the ellipsoid surface
        let a = dx * dx + dy * dy + k * dz * dz;
        let b = -2.0 * self.h * dx;
        let c = self.h * self.h - self.req * self.req;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }
        let rs = (-b - discriminant.sqrt()) / (2.0 * a);

        let sx = rs * dx;
        let sy = rs * dy;
        let sz = rs * dz;

        let lat = (k * sz / (self.h - sx).hypot(sy)).atan();
        let lon = self.lambda_0 - sy.atan2(self.h - sx);

        Some((normalize_lon(lon.to_degrees()), lat.to_degrees()))
    }

    /// Convert geographic coordinates (lon/lat degrees) to scan angles (radians).
    ///
    /// Returns `None` if the point is not visible from the satellite.
    pub fn geo_to_scan(&self, lon_deg: f64, lat_deg: f64) -> Option<(f64, f64)> {
        if !(-90.0..=90.0).contains(&lat_deg) {
            return None;
        }
        let lat = lat_deg.to_radians();
        let dlon = lon_deg.to_radians() - self.lambda_0;

        // Geocentric latitude and radius on the ellipsoid
        let ratio = (self.rpol / self.req).powi(2);
        let phi_c = (ratio * lat.tan()).atan();
        let e2 = 1.0 - ratio;
        let rc = self.rpol / (1.0 - e2 * phi_c.cos().powi(2)).sqrt();

        let sx = self.h - rc * phi_c.cos() * dlon.cos();
        let sy = -rc * phi_c.cos() * dlon.sin();
        let sz = rc * phi_c.sin();

        // Behind the limb
        if self.h * (self.h - sx) < sy * sy + sz * sz / ratio {
            return None;
        }

        let (x, y) = if self.sweep_x {
            let norm = (sx * sx + sy * sy + sz * sz).sqrt();
            ((-sy / norm).asin(), sz.atan2(sx))
        } else {
            ((-sy).atan2(sx), sz.atan2(sx.hypot(sy)))
        };
        Some((x, y))
    }
}

impl Projection for Geostationary {
    fn project(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        self.geo_to_scan(lon, lat).map(|(x, y)| {
            (
                x * self.perspective_point_height,
                y * self.perspective_point_height,
            )
        })
    }

    fn unproject(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        self.scan_to_geo(
            x / self.perspective_point_height,
            y / self.perspective_point_height,
        )
    }
}

fn normalize_lon(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else if lon < -180.0 {
        lon + 360.0
    } else {
        lon
    }
}
