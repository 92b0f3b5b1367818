//! Output modes and the per-mode configuration handed to the tile
//! generator.
//!
//! Each viewer expects something slightly different alongside the canvas:
//! KML needs a lon/lat footprint plus LOD settings, Uniview and Celestia need
//! a module name, Gigapan needs a footprint. [`ModeConfig`] carries exactly
//! what its variant needs and nothing else.

use crate::config::{ConfigError, MosaicOptions};
use crate::geometry::{BBox2, BBox2i};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tile pyramid flavour to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Plain quadtree of a single, non-georeferenced image.
    #[default]
    None,
    Kml,
    Tms,
    Uniview,
    Gmap,
    Celestia,
    Gigapan,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::None => "none",
            Mode::Kml => "kml",
            Mode::Tms => "tms",
            Mode::Uniview => "uniview",
            Mode::Gmap => "gmap",
            Mode::Celestia => "celestia",
            Mode::Gigapan => "gigapan",
        }
    }

    /// Whether the canvas bbox must be snapped to a power-of-two tile grid
    /// anchored at the canvas origin.
    pub fn requires_aligned_bbox(self) -> bool {
        matches!(self, Mode::Kml)
    }

    /// Whether the total resolution must be a power of two so that every
    /// pyramid level halves evenly.
    pub fn requires_power_of_two_resolution(self) -> bool {
        matches!(
            self,
            Mode::Kml | Mode::Tms | Mode::Gmap | Mode::Uniview | Mode::Celestia
        )
    }

    /// Whether the mode needs a module name.
    pub fn requires_module_name(self) -> bool {
        matches!(self, Mode::Uniview | Mode::Celestia)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Mode::None),
            "kml" => Ok(Mode::Kml),
            "tms" => Ok(Mode::Tms),
            "uniview" => Ok(Mode::Uniview),
            "gmap" => Ok(Mode::Gmap),
            "celestia" => Ok(Mode::Celestia),
            "gigapan" => Ok(Mode::Gigapan),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

/// Mode-specific values for the tile generator's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ModeConfig {
    None,
    Kml {
        longlat_bbox: BBox2,
        max_lod_pixels: Option<u32>,
        draw_order_offset: u32,
    },
    Tms,
    Uniview {
        module: String,
        terrain: bool,
    },
    Gmap,
    Celestia {
        module: String,
    },
    Gigapan {
        longlat_bbox: BBox2,
    },
}

impl ModeConfig {
    /// Derive the configuration for `options.mode` from the finished canvas
    /// geometry.
    ///
    /// `aligned_bbox` is the canvas bbox in output pixels and `xres`/`yres`
    /// the output resolution it lives in.
    pub fn derive(
        options: &MosaicOptions,
        aligned_bbox: BBox2i,
        xres: u32,
        yres: u32,
    ) -> Result<Self, ConfigError> {
        Ok(match options.mode {
            Mode::None => ModeConfig::None,
            Mode::Kml => kml_config(options, aligned_bbox, xres, yres),
            Mode::Tms => ModeConfig::Tms,
            Mode::Uniview => uniview_config(options)?,
            Mode::Gmap => ModeConfig::Gmap,
            Mode::Celestia => celestia_config(options)?,
            Mode::Gigapan => ModeConfig::Gigapan {
                longlat_bbox: longlat_bbox(aligned_bbox, xres, yres),
            },
        })
    }

    pub fn mode(&self) -> Mode {
        match self {
            ModeConfig::None => Mode::None,
            ModeConfig::Kml { .. } => Mode::Kml,
            ModeConfig::Tms => Mode::Tms,
            ModeConfig::Uniview { .. } => Mode::Uniview,
            ModeConfig::Gmap => Mode::Gmap,
            ModeConfig::Celestia { .. } => Mode::Celestia,
            ModeConfig::Gigapan { .. } => Mode::Gigapan,
        }
    }
}

fn kml_config(options: &MosaicOptions, aligned_bbox: BBox2i, xres: u32, yres: u32) -> ModeConfig {
    ModeConfig::Kml {
        longlat_bbox: longlat_bbox(aligned_bbox, xres, yres),
        max_lod_pixels: options.kml.max_lod_pixels,
        draw_order_offset: options.kml.draw_order_offset,
    }
}

fn uniview_config(options: &MosaicOptions) -> Result<ModeConfig, ConfigError> {
    Ok(ModeConfig::Uniview {
        module: module_name(options)?,
        terrain: options.terrain,
    })
}

fn celestia_config(options: &MosaicOptions) -> Result<ModeConfig, ConfigError> {
    Ok(ModeConfig::Celestia {
        module: module_name(options)?,
    })
}

fn module_name(options: &MosaicOptions) -> Result<String, ConfigError> {
    options
        .module_name
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or(ConfigError::MissingModuleName(options.mode))
}

/// Lon/lat footprint of a pixel bbox in the global output projection.
///
/// The output spans 360 degrees across `xres` columns and 360 degrees down
/// `yres` rows starting at latitude +180, the square extent the quadtree
/// viewers use. The result's minimum corner is (west, south).
pub fn longlat_bbox(bbox: BBox2i, xres: u32, yres: u32) -> BBox2 {
    let (xres, yres) = (xres as f64, yres as f64);
    BBox2::new(
        -180.0 + (360.0 * bbox.min_x as f64) / xres,
        180.0 - (360.0 * bbox.max_y as f64) / yres,
        (360.0 * bbox.width() as f64) / xres,
        (360.0 * bbox.height() as f64) / yres,
    )
}
