//! Affine pixel-to-CRS transforms.
//!
//! Coefficients follow the GDAL convention:
//!
//! ```text
//! x = c + a * col + b * row
//! y = f + d * col + e * row
//! ```
//!
//! `(col, row)` address pixel *edges*, so `(0.5, 0.5)` is the centre of the
//! top-left pixel.

use nalgebra::{Matrix3, Vector3};

/// Affine mapping from pixel (col, row) to CRS (x, y).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    matrix: Matrix3<f64>,
}

impl GeoTransform {
    /// North-up transform without rotation terms.
    pub fn north_up(origin_x: f64, pixel_width: f64, origin_y: f64, pixel_height: f64) -> Self {
        Self::from_gdal([origin_x, pixel_width, 0.0, origin_y, 0.0, pixel_height])
    }

    /// Build from GDAL ordering `[c, a, b, f, d, e]`.
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        let [c, a, b, f, d, e] = gt;
        Self {
            matrix: Matrix3::new(a, b, c, d, e, f, 0.0, 0.0, 1.0),
        }
    }

    /// Coefficients in GDAL ordering `[c, a, b, f, d, e]`.
    pub fn to_gdal(&self) -> [f64; 6] {
        let m = &self.matrix;
        [m[(0, 2)], m[(0, 0)], m[(0, 1)], m[(1, 2)], m[(1, 0)], m[(1, 1)]]
    }

    /// Map a pixel position to CRS coordinates.
    #[inline]
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let v = self.matrix * Vector3::new(col, row, 1.0);
        (v.x, v.y)
    }

    /// Inverse transform, or `None` when the matrix is singular.
    pub fn inverse(&self) -> Option<GeoTransform> {
        self.matrix
            .try_inverse()
            .map(|matrix| GeoTransform { matrix })
    }

    /// CRS coordinates of the pixel centre.
    #[inline]
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Pixel width and height (height is negative for north-up grids).
    pub fn pixel_size(&self) -> (f64, f64) {
        (self.matrix[(0, 0)], self.matrix[(1, 1)])
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` of a `width` x `height` grid.
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(width as f64, 0.0),
            self.apply(0.0, height as f64),
            self.apply(width as f64, height as f64),
        ];
        corners.iter().fold(
            (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
            |(min_x, min_y, max_x, max_y), &(x, y)| {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            },
        )
    }
}
