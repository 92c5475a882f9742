//! Resampling kernels.
//!
//! Sample positions are in pixel-centre coordinates: `(0.0, 0.0)` is the
//! centre of the top-left pixel.

/// Bilinear interpolation that tolerates missing neighbours.
///
/// Weights of `NaN` neighbours are dropped and the remaining weights are
/// renormalized. Positions more than half a pixel outside the grid, or with
/// no valid neighbour, give `NaN`.
pub fn bilinear(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    let (w, h) = (width as f64, height as f64);
    if !(x >= -0.5 && x <= w - 0.5 && y >= -0.5 && y <= h - 0.5) {
        return f32::NAN;
    }

    let x = x.clamp(0.0, w - 1.0);
    let y = y.clamp(0.0, h - 1.0);
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let neighbours = [
        (data[y0 * width + x0], (1.0 - fx) * (1.0 - fy)),
        (data[y0 * width + x1], fx * (1.0 - fy)),
        (data[y1 * width + x0], (1.0 - fx) * fy),
        (data[y1 * width + x1], fx * fy),
    ];

    let mut sum = 0.0;
    let mut weight = 0.0;
    for (v, wt) in neighbours {
        if v.is_finite() && wt > 0.0 {
            sum += v as f64 * wt;
            weight += wt;
        }
    }

    if weight > 0.0 {
        (sum / weight) as f32
    } else {
        f32::NAN
    }
}
