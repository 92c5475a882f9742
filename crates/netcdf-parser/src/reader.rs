//! Native GOES-R ABI channel reader built on the `netcdf` crate.

use std::path::Path;
use std::sync::Once;

use imagery_common::{Crs, GeoTransform, GeostationaryParams};
use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};

/// Data variables in order of preference: L1b radiance, then L2 CMI.
const DATA_VARIABLES: [&str; 2] = ["Rad", "CMI"];

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose diagnostics even when a missing optional
/// attribute is handled gracefully. Call once early in `main()`; it is also
/// called before every read and is safe to repeat.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and null handlers are a
        // documented way to disable automatic error printing.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// One decoded ABI channel on its native fixed grid.
#[derive(Debug, Clone)]
pub struct AbiChannel {
    /// Variable the values came from (`Rad` or `CMI`)
    pub variable: String,
    pub width: usize,
    pub height: usize,
    /// Physical values, row-major from the north; fill values are `NaN`
    pub data: Vec<f32>,
    pub params: GeostationaryParams,
    /// Pixel to projection metres (scan angle times perspective point height)
    pub transform: GeoTransform,
    pub units: Option<String>,
}

impl AbiChannel {
    pub fn crs(&self) -> Crs {
        Crs::Geostationary(self.params.clone())
    }
}

/// Read the data variable, projection and grid of one ABI file.
pub fn read_abi_channel<P: AsRef<Path>>(path: P) -> NetCdfResult<AbiChannel> {
    silence_hdf5_errors();

    let path = path.as_ref();
    let library = |e: netcdf::Error| NetCdfError::Library {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let file = netcdf::open(path).map_err(library)?;

    let width = dimension_len(&file, "x")?;
    let height = dimension_len(&file, "y")?;

    let (variable, var) = DATA_VARIABLES
        .iter()
        .find_map(|name| file.variable(name).map(|v| (*name, v)))
        .ok_or_else(|| NetCdfError::MissingData("Rad or CMI variable".to_string()))?;

    let raw: Vec<i16> = var.get_values(..).map_err(library)?;
    if raw.len() != width * height {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} has {} values, expected {}x{}",
            variable,
            raw.len(),
            width,
            height
        )));
    }

    let packing = Packing {
        scale: get_f32_attr(&var, "scale_factor").unwrap_or(1.0) as f64,
        offset: get_f32_attr(&var, "add_offset").unwrap_or(0.0) as f64,
        fill: get_i16_attr(&var, "_FillValue"),
        unsigned: get_string_attr(&var, "_Unsigned")
            .is_some_and(|s| s.eq_ignore_ascii_case("true")),
    };
    let data: Vec<f32> = raw.iter().map(|&v| packing.unpack(v) as f32).collect();
    let units = get_string_attr(&var, "units");

    let x = read_coordinate(&file, "x", width, library)?;
    let y = read_coordinate(&file, "y", height, library)?;

    let proj_var = file
        .variable("goes_imager_projection")
        .ok_or_else(|| NetCdfError::MissingData("goes_imager_projection variable".to_string()))?;
    let defaults = GeostationaryParams::default();
    let params = GeostationaryParams {
        perspective_point_height: get_f64_attr(&proj_var, "perspective_point_height")
            .ok_or_else(|| NetCdfError::MissingData("perspective_point_height".to_string()))?,
        semi_major_axis: get_f64_attr(&proj_var, "semi_major_axis")
            .unwrap_or(defaults.semi_major_axis),
        semi_minor_axis: get_f64_attr(&proj_var, "semi_minor_axis")
            .unwrap_or(defaults.semi_minor_axis),
        longitude_origin: get_f64_attr(&proj_var, "longitude_of_projection_origin")
            .unwrap_or(defaults.longitude_origin),
        sweep_x: get_string_attr(&proj_var, "sweep_angle_axis").map_or(true, |s| s == "x"),
    };

    let h = params.perspective_point_height;
    let (dx, dy) = (x.step, y.step);
    let transform = GeoTransform::north_up(
        (x.first - dx / 2.0) * h,
        dx * h,
        (y.first - dy / 2.0) * h,
        dy * h,
    );

    debug!(
        path = %path.display(),
        variable,
        width,
        height,
        lon_0 = params.longitude_origin,
        "Read ABI channel"
    );

    Ok(AbiChannel {
        variable: variable.to_string(),
        width,
        height,
        data,
        params,
        transform,
        units,
    })
}

// =============================================================================
// Internal helpers
// =============================================================================

/// CF packing attributes of an `i16` variable.
struct Packing {
    scale: f64,
    offset: f64,
    fill: Option<i16>,
    unsigned: bool,
}

impl Packing {
    fn unpack(&self, raw: i16) -> f64 {
        if Some(raw) == self.fill {
            return f64::NAN;
        }
        let v = if self.unsigned {
            raw as u16 as f64
        } else {
            raw as f64
        };
        v * self.scale + self.offset
    }
}

/// First pixel-centre value and spacing of a scan-angle coordinate.
struct Axis {
    first: f64,
    step: f64,
}

fn read_coordinate(
    file: &netcdf::File,
    name: &str,
    len: usize,
    library: impl Fn(netcdf::Error) -> NetCdfError,
) -> NetCdfResult<Axis> {
    let var = file
        .variable(name)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} variable", name)))?;
    let raw: Vec<i16> = var.get_values(..).map_err(library)?;
    if raw.len() != len || raw.is_empty() {
        return Err(NetCdfError::InvalidFormat(format!(
            "coordinate {} has {} values, expected {}",
            name,
            raw.len(),
            len
        )));
    }

    let scale = get_f32_attr(&var, "scale_factor").unwrap_or(1.0) as f64;
    let offset = get_f32_attr(&var, "add_offset").unwrap_or(0.0) as f64;
    let value = |i: usize| raw[i] as f64 * scale + offset;

    let first = value(0);
    let step = if len > 1 {
        (value(len - 1) - first) / (len - 1) as f64
    } else {
        scale
    };
    if step == 0.0 || !step.is_finite() {
        return Err(NetCdfError::InvalidFormat(format!(
            "coordinate {} has zero spacing",
            name
        )));
    }
    Ok(Axis { first, step })
}

fn dimension_len(file: &netcdf::File, name: &str) -> NetCdfResult<usize> {
    file.dimension(name)
        .map(|d| d.len())
        .ok_or_else(|| NetCdfError::MissingData(format!("{} dimension", name)))
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f32_attr(var: &netcdf::Variable, name: &str) -> Option<f32> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f32::try_from(attr_value).ok()
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

fn get_i16_attr(var: &netcdf::Variable, name: &str) -> Option<i16> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    i16::try_from(attr_value).ok()
}

fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}
