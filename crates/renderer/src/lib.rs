//! Display rendering for satellite rasters.
//!
//! Turns a multi-band `f32` raster into an 8-bit browser image:
//! - per-band linear stretch to 0..=255
//! - band to channel composition (gray, gray+alpha, RGB, RGBA)
//! - PNG encoding

pub mod display;
pub mod error;
pub mod png;

pub use display::{encode_display_png, render_display, stretch_band, DisplayImage};
pub use error::{RenderError, RenderResult};
pub use png::{encode_png, ColorType};
