//! Linear stretch of raster bands into displayable 8-bit channels.

use imagery_common::Raster;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{RenderError, RenderResult};
use crate::png::{encode_png, ColorType};

/// An 8-bit interleaved image ready for encoding.
#[derive(Debug, Clone)]
pub struct DisplayImage {
    pub pixels: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub color_type: ColorType,
}

/// Stretch one band linearly so its finite minimum maps to 0 and its maximum
/// to 255.
///
/// A constant band maps every valid pixel to 0. Non-finite values map to 0.
/// Returns the stretched bytes and the `(min, max)` range used, or `None`
/// for the range when the band has no finite value.
pub fn stretch_band(values: &[f32]) -> (Vec<u8>, Option<(f32, f32)>) {
    let range = values
        .iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f32, f32)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        });

    let bytes = match range {
        Some((min, max)) if max > min => {
            let scale = 255.0 / (max as f64 - min as f64);
            values
                .iter()
                .map(|&v| {
                    if v.is_finite() {
                        ((v as f64 - min as f64) * scale).round().clamp(0.0, 255.0) as u8
                    } else {
                        0
                    }
                })
                .collect()
        }
        _ => vec![0; values.len()],
    };

    (bytes, range)
}

/// Compose a raster's bands into an 8-bit image, band order as channel order.
///
/// One or three bands with missing pixels get an extra alpha channel so the
/// area outside the data footprint is transparent.
pub fn render_display(raster: &Raster) -> RenderResult<DisplayImage> {
    let band_count = raster.band_count();
    if !(1..=4).contains(&band_count) {
        return Err(RenderError::UnsupportedBandCount(band_count));
    }
    if raster.valid_count() == 0 {
        return Err(RenderError::NoValidPixels);
    }

    let stretched: Vec<(Vec<u8>, Option<(f32, f32)>)> = raster
        .bands()
        .par_iter()
        .map(|band| stretch_band(band))
        .collect();

    for (index, (_, range)) in stretched.iter().enumerate() {
        debug!(band = index, range = ?range, "Stretched band");
    }

    let pixel_count = raster.width * raster.height;
    let has_gaps = raster
        .bands()
        .iter()
        .any(|band| band.iter().any(|v| !v.is_finite()));

    let (color_type, add_alpha) = match (band_count, has_gaps) {
        (1, false) => (ColorType::Gray, false),
        (1, true) => (ColorType::GrayAlpha, true),
        (2, _) => (ColorType::GrayAlpha, false),
        (3, false) => (ColorType::Rgb, false),
        (3, true) => (ColorType::Rgba, true),
        _ => (ColorType::Rgba, false),
    };

    let mut pixels = Vec::with_capacity(pixel_count * color_type.channels());
    for i in 0..pixel_count {
        for (bytes, _) in &stretched {
            pixels.push(bytes[i]);
        }
        if add_alpha {
            let valid = raster.bands().iter().all(|band| band[i].is_finite());
            pixels.push(if valid { 255 } else { 0 });
        }
    }

    Ok(DisplayImage {
        pixels,
        width: raster.width,
        height: raster.height,
        color_type,
    })
}

/// Stretch, compose and PNG-encode a raster.
pub fn encode_display_png(raster: &Raster) -> RenderResult<Vec<u8>> {
    let image = render_display(raster)?;
    encode_png(&image.pixels, image.width, image.height, image.color_type)
}
