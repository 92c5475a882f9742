//! NetCDF reader for GOES-R ABI imagery.
//!
//! Reads a single ABI channel, either the L1b radiance product (`Rad`) or the
//! L2 cloud and moisture imagery product (`CMI`), together with the
//! geostationary projection and the affine transform of its fixed grid.
//!
//! # GOES-R ABI Data Structure
//!
//! ABI files use the geostationary projection with `x`/`y` coordinates in
//! scan-angle radians, packed as scaled `i16`. Data variables are packed the
//! same way, and L1b radiances are flagged `_Unsigned` so the raw values
//! must be reinterpreted as `u16` before scaling.

pub mod error;
pub mod reader;

pub use error::{NetCdfError, NetCdfResult};
pub use reader::{read_abi_channel, silence_hdf5_errors, AbiChannel};
