//! CPU-bound pipeline stages.
//!
//! Each stage is a trait so tests can substitute counting or failing fakes.
//! Stages are synchronous; the orchestrator runs them on the blocking pool.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use imagery_common::{Crs, DecodedScene, Raster, ReprojectedRaster};
use netcdf_parser::{read_abi_channel, AbiChannel};
use tracing::debug;

use crate::config::DatasetConfig;

/// Decodes raw files into the named dataset.
pub trait SceneDecoder: Send + Sync {
    fn decode(&self, files: &[PathBuf], dataset: &DatasetConfig) -> Result<DecodedScene>;
}

/// Warps a decoded scene into the target CRS.
pub trait Reprojector: Send + Sync {
    fn reproject(&self, scene: DecodedScene, target: &Crs) -> Result<ReprojectedRaster>;
}

/// Encodes a reprojected raster into displayable image bytes.
pub trait DisplayEncoder: Send + Sync {
    fn encode(&self, raster: &ReprojectedRaster) -> Result<Vec<u8>>;

    /// File extension of the encoded image.
    fn extension(&self) -> &'static str {
        "png"
    }
}

/// Reads one ABI file per channel with the native NetCDF reader.
#[derive(Debug, Default, Clone, Copy)]
pub struct AbiSceneDecoder;

impl AbiSceneDecoder {
    fn file_for_channel<'a>(files: &'a [PathBuf], channel: u8) -> Option<&'a PathBuf> {
        let token = format!("C{:02}_G", channel);
        files.iter().find(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(&token))
        })
    }
}

impl SceneDecoder for AbiSceneDecoder {
    fn decode(&self, files: &[PathBuf], dataset: &DatasetConfig) -> Result<DecodedScene> {
        let mut first: Option<AbiChannel> = None;
        let mut bands = Vec::with_capacity(dataset.channels.len());

        for &channel in &dataset.channels {
            let path = Self::file_for_channel(files, channel)
                .ok_or_else(|| anyhow!("no file for channel {} of {}", channel, dataset.name))?;
            let mut abi = read_abi_channel(path)
                .with_context(|| format!("reading {}", path.display()))?;
            debug!(channel, variable = %abi.variable, units = ?abi.units, "Decoded channel");

            if let Some(reference) = &first {
                if (abi.width, abi.height) != (reference.width, reference.height)
                    || abi.transform != reference.transform
                    || abi.params != reference.params
                {
                    bail!(
                        "channel {} grid {}x{} does not match {}x{}",
                        channel,
                        abi.width,
                        abi.height,
                        reference.width,
                        reference.height
                    );
                }
            }
            bands.push(std::mem::take(&mut abi.data));
            if first.is_none() {
                first = Some(abi);
            }
        }

        let reference = first.ok_or_else(|| anyhow!("dataset {} has no channels", dataset.name))?;
        let raster = Raster::new(
            dataset.name.clone(),
            reference.crs(),
            reference.transform,
            reference.width,
            reference.height,
            bands,
        )?;
        Ok(DecodedScene::new(raster))
    }
}

/// Default-grid bilinear warp.
#[derive(Debug, Default, Clone, Copy)]
pub struct BilinearReprojector;

impl Reprojector for BilinearReprojector {
    fn reproject(&self, scene: DecodedScene, target: &Crs) -> Result<ReprojectedRaster> {
        let grid = projection::suggest_output_grid(&scene, target)?;
        let raster = projection::warp_bilinear(&scene, target, &grid)?;
        Ok(ReprojectedRaster::new(raster))
    }
}

/// Per-band stretch into a PNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct PngDisplayEncoder;

impl DisplayEncoder for PngDisplayEncoder {
    fn encode(&self, raster: &ReprojectedRaster) -> Result<Vec<u8>> {
        Ok(renderer::encode_display_png(raster)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagery_common::GeoTransform;

    #[test]
    fn test_file_for_channel() {
        let files = vec![
            PathBuf::from("/d/OR_ABI-L1b-RadC-M6C02_G16_s20250951230007_e1_c1.nc"),
            PathBuf::from("/d/OR_ABI-L1b-RadC-M6C13_G16_s20250951230007_e1_c1.nc"),
        ];
        assert_eq!(AbiSceneDecoder::file_for_channel(&files, 13), Some(&files[1]));
        assert_eq!(AbiSceneDecoder::file_for_channel(&files, 2), Some(&files[0]));
        assert_eq!(AbiSceneDecoder::file_for_channel(&files, 1), None);
    }

    #[test]
    fn test_decoder_missing_file() {
        let err = AbiSceneDecoder
            .decode(&[], &DatasetConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("channel 13"));
    }

    #[test]
    fn test_reproject_preserves_bands() {
        let raster = Raster::new(
            "rgb",
            Crs::Geographic,
            GeoTransform::north_up(-90.0, 0.5, 40.0, -0.5),
            8,
            8,
            vec![vec![1.0; 64], vec![2.0; 64], vec![3.0; 64]],
        )
        .unwrap();
        let out = BilinearReprojector
            .reproject(DecodedScene::new(raster), &Crs::WebMercator)
            .unwrap();
        assert_eq!(out.band_count(), 3);
        assert_eq!(out.crs, Crs::WebMercator);
    }

    #[test]
    fn test_encoder_produces_png() {
        let raster = Raster::new(
            "c13",
            Crs::WebMercator,
            GeoTransform::north_up(0.0, 1.0, 0.0, -1.0),
            2,
            2,
            vec![vec![200.0, 220.0, f32::NAN, 300.0]],
        )
        .unwrap();
        let png = PngDisplayEncoder
            .encode(&ReprojectedRaster::new(raster))
            .unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}
