//! Raster warping between coordinate reference systems.

use imagery_common::{Crs, Raster};
use rayon::prelude::*;
use tracing::debug;

use crate::error::{ProjectionError, ProjectionResult};
use crate::grid::OutputGrid;
use crate::interpolation::bilinear;
use crate::transform::CrsTransform;

/// Warp every band of `src` onto `grid` in `dst_crs` with bilinear resampling.
///
/// Output pixels whose centre does not land on the source grid, or that are
/// not visible from the source projection, are `NaN`. Source positions are
/// computed once per output pixel and shared by all bands.
pub fn warp_bilinear(src: &Raster, dst_crs: &Crs, grid: &OutputGrid) -> ProjectionResult<Raster> {
    let inverse = src
        .transform
        .inverse()
        .ok_or(ProjectionError::SingularTransform)?;
    let transform = CrsTransform::new(&src.crs, dst_crs);
    let (width, height) = (grid.width, grid.height);

    let mut positions = vec![(f32::NAN, f32::NAN); width * height];
    positions
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, out)| {
            for (col, slot) in out.iter_mut().enumerate() {
                let (x, y) = grid.transform.pixel_center(col, row);
                if let Some((sx, sy)) = transform.backward(x, y) {
                    let (c, r) = inverse.apply(sx, sy);
                    *slot = ((c - 0.5) as f32, (r - 0.5) as f32);
                }
            }
        });

    let bands = src
        .bands()
        .iter()
        .map(|data| {
            let mut out = vec![f32::NAN; width * height];
            out.par_chunks_mut(width)
                .zip(positions.par_chunks(width))
                .for_each(|(out_row, pos_row)| {
                    for (v, &(c, r)) in out_row.iter_mut().zip(pos_row) {
                        if c.is_finite() && r.is_finite() {
                            *v = bilinear(data, src.width, src.height, c as f64, r as f64);
                        }
                    }
                });
            out
        })
        .collect();

    let raster = Raster::new(
        src.name.clone(),
        dst_crs.clone(),
        grid.transform,
        width,
        height,
        bands,
    )?;

    debug!(
        name = %raster.name,
        width,
        height,
        bands = raster.band_count(),
        valid = raster.valid_count(),
        "Warped raster"
    );
    Ok(raster)
}
