//! QTMosaic Core - georeferenced mosaic compositor
//!
//! This crate assembles independently georeferenced rasters into one canvas
//! in a chosen output projection, ready to be cut into a quadtree tile
//! pyramid: per-image reprojection, antimeridian wraparound, nodata masking,
//! normalization, and mode-specific canvas alignment.
//!
//! Decoding files, the projection engine and tile generation are external
//! collaborators, reached through the [`ImageSource`], [`GeoReference`] and
//! [`Transform`] traits and the [`MosaicOutput`] handoff.

pub mod composite;
pub mod config;
pub mod geometry;
pub mod georef;
pub mod mode;
pub mod mosaic;
pub mod reproject;
pub mod resolution;
pub mod resolve;
pub mod source;

pub use composite::{
    BlendMode, ImageComposite, LogProgress, NullProgress, PreparedComposite, ProgressCallback,
};
pub use config::{
    ConfigError, DatumOverride, DatumSettings, ManualBounds, MosaicOptions, Projection,
};
pub use geometry::{BBox2, BBox2i, GeometryError, Vector2};
pub use georef::{EquirectGeoReference, GeoReference, GeoTransform, Transform};
pub use mode::{Mode, ModeConfig};
pub use mosaic::{build_mosaic, InputImage, MosaicOutput};
pub use source::{
    ChannelType, DynamicImageSource, ImageSource, MaskedImage, MemorySource, PixelFormat,
    SourceError,
};

use thiserror::Error;

/// Any failure of a mosaic run. All of them are fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MosaicError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_convert_and_display() {
        let err: MosaicError = GeometryError::EmptyTotalBBox {
            bbox: BBox2i::new(0, 0, 0, 4),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Total bbox [0, 0]-[0, 4] (0x4) is empty. Georeference calculation is probably incorrect."
        );

        let err: MosaicError = ConfigError::NoInputs.into();
        assert!(matches!(err, MosaicError::Config(ConfigError::NoInputs)));
    }
}
