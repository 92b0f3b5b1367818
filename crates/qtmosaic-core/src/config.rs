//! Mosaic options and their consistency rules.
//!
//! Options are a plain serde struct so they can come from a CLI layer, a
//! JSON job file or code alike. [`MosaicOptions::validate`] must pass before
//! any pixel is reprojected.

use crate::mode::Mode;
use crate::source::ChannelType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inconsistent or missing options. Raised before any reprojection work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Need at least one input image")]
    NoInputs,

    #[error("Unknown mode '{0}'")]
    UnknownMode(String),

    #[error("Cannot override georeference information on multiple images")]
    ManualBoundsWithMultipleInputs,

    #[error("If you provide one, you must provide all of: north, south, east, west")]
    IncompleteManualBounds,

    #[error("Non-georeferenced images cannot be composed")]
    NonGeoreferencedComposition,

    #[error("Mode '{0}' requires a module name")]
    MissingModuleName(Mode),

    #[error("Aspect ratio must be at least 1, got {0}")]
    InvalidAspectRatio(u32),

    #[error("Tile size must be non-zero")]
    InvalidTileSize,

    #[error("Input '{0}' has no georeference and no manual bounds were given")]
    MissingGeoreference(String),

    #[error("Mode '{0}' has no built-in output projection; supply one explicitly")]
    OutputProjectionUnavailable(Mode),

    #[error("Invalid output projection: {0}")]
    InvalidOutputProjection(String),

    #[error("Sphere datum override requires a radius")]
    SphereDatumWithoutRadius,
}

/// Manual lon/lat bounds overriding a single input's georeference.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualBounds {
    pub north: Option<f64>,
    pub south: Option<f64>,
    pub east: Option<f64>,
    pub west: Option<f64>,
}

impl ManualBounds {
    /// The whole globe.
    pub fn global() -> Self {
        Self {
            north: Some(90.0),
            south: Some(-90.0),
            east: Some(180.0),
            west: Some(-180.0),
        }
    }

    pub fn any_set(&self) -> bool {
        self.north.is_some() || self.south.is_some() || self.east.is_some() || self.west.is_some()
    }

    /// `(north, south, east, west)` if all four are set.
    pub fn complete(&self) -> Option<(f64, f64, f64, f64)> {
        Some((self.north?, self.south?, self.east?, self.west?))
    }
}

/// KML-specific settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KmlSettings {
    /// Max on-screen pixels before a region's children are loaded.
    pub max_lod_pixels: Option<u32>,
    /// Offset added to every overlay's draw order.
    pub draw_order_offset: u32,
}

/// Datum the projection engine should assume for the inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatumOverride {
    #[default]
    None,
    Wgs84,
    Lunar,
    Mars,
    Sphere,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatumSettings {
    pub kind: DatumOverride,
    /// Radius in meters, required for [`DatumOverride::Sphere`].
    pub sphere_radius: Option<f64>,
}

/// Projection override handed to the projection engine.
///
/// Only [`Projection::None`] changes what the compositor does: the input is
/// treated as non-georeferenced, as in [`Mode::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    #[default]
    Default,
    None,
    Sinusoidal,
    Mercator,
    TransverseMercator,
    Orthographic,
    Stereographic,
    LambertAzimuthal,
    LambertConformalConic,
    Utm,
    PlateCarree,
}

/// Options for one mosaic run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MosaicOptions {
    pub mode: Mode,
    /// Working channel type; `None` uses the first input's.
    pub channel_type: Option<ChannelType>,
    /// Nodata value overriding whatever the inputs store.
    pub nodata: Option<f32>,
    pub pixel_scale: Option<f32>,
    pub pixel_offset: Option<f32>,
    /// Divisor of the total resolution giving the canvas width.
    pub aspect_ratio: u32,
    /// Forces the total resolution instead of deriving it from the inputs.
    pub global_resolution: Option<u32>,
    /// Stretch the observed value range over the channel's full range.
    pub normalize: bool,
    /// Blend overlapping inputs instead of last-wins drafting.
    pub multiband: bool,
    /// Uniview: the mosaic is a terrain layer.
    pub terrain: bool,
    pub module_name: Option<String>,
    pub bounds: ManualBounds,
    /// Treat the single input as covering the whole globe.
    pub global: bool,
    pub kml: KmlSettings,
    pub datum: DatumSettings,
    pub projection: Projection,
    pub tile_size: u32,
    pub file_type: String,
}

impl Default for MosaicOptions {
    fn default() -> Self {
        Self {
            mode: Mode::None,
            channel_type: None,
            nodata: None,
            pixel_scale: None,
            pixel_offset: None,
            aspect_ratio: 1,
            global_resolution: None,
            normalize: false,
            multiband: false,
            terrain: false,
            module_name: None,
            bounds: ManualBounds::default(),
            global: false,
            kml: KmlSettings::default(),
            datum: DatumSettings::default(),
            projection: Projection::Default,
            tile_size: 256,
            file_type: "png".to_string(),
        }
    }
}

impl MosaicOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the options against the number of inputs.
    pub fn validate(&self, input_count: usize) -> Result<(), ConfigError> {
        if input_count == 0 {
            return Err(ConfigError::NoInputs);
        }

        if self.datum.kind == DatumOverride::Sphere && self.datum.sphere_radius.is_none() {
            return Err(ConfigError::SphereDatumWithoutRadius);
        }

        if self.has_manual_georef() {
            if input_count != 1 {
                return Err(ConfigError::ManualBoundsWithMultipleInputs);
            }
            if !self.global && self.bounds.complete().is_none() {
                return Err(ConfigError::IncompleteManualBounds);
            }
        }

        if !self.is_georeferenced() && input_count != 1 {
            return Err(ConfigError::NonGeoreferencedComposition);
        }

        if self.mode.requires_module_name()
            && self.module_name.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::MissingModuleName(self.mode));
        }

        if self.aspect_ratio == 0 {
            return Err(ConfigError::InvalidAspectRatio(self.aspect_ratio));
        }

        if self.tile_size == 0 {
            return Err(ConfigError::InvalidTileSize);
        }

        Ok(())
    }

    /// False when either the mode or the projection override turns
    /// georeferencing off.
    pub fn is_georeferenced(&self) -> bool {
        self.mode != Mode::None && self.projection != Projection::None
    }

    /// Whether the single input's georeference is overridden.
    pub fn has_manual_georef(&self) -> bool {
        self.global || self.bounds.any_set()
    }

    /// Manual bounds with `global` expanded, if complete.
    pub fn resolved_bounds(&self) -> Option<(f64, f64, f64, f64)> {
        if self.global {
            ManualBounds::global().complete()
        } else {
            self.bounds.complete()
        }
    }
}
