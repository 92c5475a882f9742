//! Default output grid selection.
//!
//! Mirrors GDAL's "suggested warp output": the source footprint is sampled
//! along its edges and on an interior lattice, transformed into the target
//! CRS, and the output keeps roughly the same number of pixels along the
//! diagonal as the source.

use imagery_common::{Crs, GeoTransform, Raster};
use tracing::debug;

use crate::error::{ProjectionError, ProjectionResult};
use crate::transform::CrsTransform;

/// Points sampled along each source edge.
const EDGE_SAMPLES: usize = 21;

/// Interior lattice size; full-disk scenes have no valid edge points.
const INTERIOR_SAMPLES: usize = 41;

/// Upper bound on either output dimension.
pub const MAX_OUTPUT_DIMENSION: usize = 20_000;

/// North-up target grid for a warp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputGrid {
    pub transform: GeoTransform,
    pub width: usize,
    pub height: usize,
}

impl OutputGrid {
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.width, self.height)
    }
}

pub fn suggest_output_grid(src: &Raster, dst_crs: &Crs) -> ProjectionResult<OutputGrid> {
    let transform = CrsTransform::new(&src.crs, dst_crs);
    let (w, h) = (src.width as f64, src.height as f64);

    let mut pixels = Vec::with_capacity(4 * EDGE_SAMPLES + INTERIOR_SAMPLES * INTERIOR_SAMPLES);
    for i in 0..EDGE_SAMPLES {
        let t = i as f64 / (EDGE_SAMPLES - 1) as f64;
        pixels.push((t * w, 0.0));
        pixels.push((t * w, h));
        pixels.push((0.0, t * h));
        pixels.push((w, t * h));
    }
    for j in 0..INTERIOR_SAMPLES {
        for i in 0..INTERIOR_SAMPLES {
            let tx = (i as f64 + 0.5) / INTERIOR_SAMPLES as f64;
            let ty = (j as f64 + 0.5) / INTERIOR_SAMPLES as f64;
            pixels.push((tx * w, ty * h));
        }
    }

    let mut bounds: Option<(f64, f64, f64, f64)> = None;
    for (col, row) in pixels {
        let (sx, sy) = src.transform.apply(col, row);
        let Some((x, y)) = transform.forward(sx, sy) else {
            continue;
        };
        if !x.is_finite() || !y.is_finite() {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((min_x, min_y, max_x, max_y)) => {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            }
        });
    }

    let (min_x, min_y, max_x, max_y) =
        bounds.ok_or_else(|| ProjectionError::NoValidSamples(dst_crs.to_string()))?;

    let diagonal = (max_x - min_x).hypot(max_y - min_y);
    if diagonal <= 0.0 {
        return Err(ProjectionError::NoValidSamples(dst_crs.to_string()));
    }
    let res = diagonal / w.hypot(h);

    let width = (((max_x - min_x) / res + 0.5) as usize).max(1);
    let height = (((max_y - min_y) / res + 0.5) as usize).max(1);
    if width > MAX_OUTPUT_DIMENSION || height > MAX_OUTPUT_DIMENSION {
        return Err(ProjectionError::OutputTooLarge {
            width,
            height,
            max: MAX_OUTPUT_DIMENSION,
        });
    }

    debug!(
        width,
        height,
        resolution = res,
        min_x,
        min_y,
        max_x,
        max_y,
        crs = %dst_crs,
        "Suggested output grid"
    );

    Ok(OutputGrid {
        transform: GeoTransform::north_up(min_x, res, max_y, -res),
        width,
        height,
    })
}
