//! In-memory multi-band rasters.
//!
//! A [`Raster`] is a georeferenced stack of `f32` bands stored row-major,
//! top row first. Missing data is `NaN`.
//!
//! The pipeline hands rasters between stages wrapped in [`DecodedScene`]
//! (native projection) and [`ReprojectedRaster`] (output projection) so a
//! stage can only accept the output of the stage before it.

use std::ops::Deref;

use crate::crs::Crs;
use crate::error::{RasterError, RasterResult};
use crate::transform::GeoTransform;

#[derive(Debug, Clone)]
pub struct Raster {
    /// Dataset name (e.g. "C13")
    pub name: String,
    pub crs: Crs,
    pub transform: GeoTransform,
    pub width: usize,
    pub height: usize,
    bands: Vec<Vec<f32>>,
}

impl Raster {
    /// Assemble a raster, checking every band holds `width * height` values.
    pub fn new(
        name: impl Into<String>,
        crs: Crs,
        transform: GeoTransform,
        width: usize,
        height: usize,
        bands: Vec<Vec<f32>>,
    ) -> RasterResult<Self> {
        if width == 0 || height == 0 {
            return Err(RasterError::EmptyGrid { width, height });
        }
        if bands.is_empty() {
            return Err(RasterError::NoBands);
        }
        let expected = width * height;
        for (band, values) in bands.iter().enumerate() {
            if values.len() != expected {
                return Err(RasterError::BandLength {
                    band,
                    expected,
                    actual: values.len(),
                });
            }
        }
        Ok(Self {
            name: name.into(),
            crs,
            transform,
            width,
            height,
            bands,
        })
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn band(&self, index: usize) -> Option<&[f32]> {
        self.bands.get(index).map(Vec::as_slice)
    }

    pub fn bands(&self) -> &[Vec<f32>] {
        &self.bands
    }

    pub fn into_bands(self) -> Vec<Vec<f32>> {
        self.bands
    }

    /// Value at (col, row) in `band`, `None` when out of range.
    pub fn get(&self, band: usize, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.bands.get(band).map(|b| b[row * self.width + col])
    }

    /// Number of finite values across all bands.
    pub fn valid_count(&self) -> usize {
        self.bands
            .iter()
            .map(|b| b.iter().filter(|v| v.is_finite()).count())
            .sum()
    }
}

/// A raster in the satellite's native projection, straight from the decoder.
#[derive(Debug, Clone)]
pub struct DecodedScene(Raster);

impl DecodedScene {
    pub fn new(raster: Raster) -> Self {
        Self(raster)
    }

    pub fn into_raster(self) -> Raster {
        self.0
    }
}

impl Deref for DecodedScene {
    type Target = Raster;

    fn deref(&self) -> &Raster {
        &self.0
    }
}

/// A raster warped into the output projection.
#[derive(Debug, Clone)]
pub struct ReprojectedRaster(Raster);

impl ReprojectedRaster {
    pub fn new(raster: Raster) -> Self {
        Self(raster)
    }

    pub fn into_raster(self) -> Raster {
        self.0
    }
}

impl Deref for ReprojectedRaster {
    type Target = Raster;

    fn deref(&self) -> &Raster {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gt() -> GeoTransform {
        GeoTransform::north_up(0.0, 1.0, 0.0, -1.0)
    }

    #[test]
    fn test_new_validates_band_length() {
        let err = Raster::new("t", Crs::Geographic, gt(), 2, 2, vec![vec![0.0; 3]]).unwrap_err();
        assert!(matches!(
            err,
            RasterError::BandLength {
                band: 0,
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(matches!(
            Raster::new("t", Crs::Geographic, gt(), 0, 2, vec![vec![]]),
            Err(RasterError::EmptyGrid { .. })
        ));
        assert!(matches!(
            Raster::new("t", Crs::Geographic, gt(), 1, 1, vec![]),
            Err(RasterError::NoBands)
        ));
    }

    #[test]
    fn test_get_and_valid_count() {
        let r = Raster::new(
            "t",
            Crs::Geographic,
            gt(),
            2,
            2,
            vec![vec![1.0, 2.0, f32::NAN, 4.0], vec![0.0; 4]],
        )
        .unwrap();
        assert_eq!(r.band_count(), 2);
        assert_eq!(r.get(0, 1, 1), Some(4.0));
        assert_eq!(r.get(0, 2, 0), None);
        assert_eq!(r.valid_count(), 7);
    }
}
