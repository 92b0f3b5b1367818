//! Output projection: how many pixels go around the globe, and the
//! georeference of the output canvas.
//!
//! The total resolution is chosen so that the finest input is not
//! downsampled. The canvas is `total_resolution / aspect_ratio` columns by
//! `total_resolution` rows.

use crate::config::{ConfigError, MosaicOptions};
use crate::geometry::Vector2;
use crate::georef::{EquirectGeoReference, GeoReference};
use crate::mode::Mode;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Resolution used when no input asks for more.
pub const MIN_TOTAL_RESOLUTION: u32 = 1024;

/// Pixels around the globe at which one pixel of the input at its centre
/// keeps its size.
///
/// Measured along both axes; the finer one wins. `None` if the georeference
/// yields a degenerate pixel.
pub fn image_resolution(georef: &dyn GeoReference, width: u32, height: u32) -> Option<u32> {
    let center = Vector2::new((width / 2) as f64, (height / 2) as f64);
    let p0 = georef.pixel_to_lonlat(center);
    let px = georef.pixel_to_lonlat(center + Vector2::new(1.0, 0.0));
    let py = georef.pixel_to_lonlat(center + Vector2::new(0.0, 1.0));

    let res = (360.0 / (px - p0).norm()).max(360.0 / (py - p0).norm());
    if !res.is_finite() || res < 1.0 || res > u32::MAX as f64 {
        return None;
    }
    Some(res.ceil() as u32)
}

/// Total resolution for `mode` over inputs given as `(georef, width,
/// height)`.
///
/// `override_resolution` (the `global_resolution` option) wins outright.
/// Otherwise the maximum over all inputs, at least
/// [`MIN_TOTAL_RESOLUTION`], rounded up to a power of two for modes whose
/// pyramid halves evenly at every level.
pub fn total_resolution<'a>(
    mode: Mode,
    inputs: impl IntoIterator<Item = (&'a dyn GeoReference, u32, u32)>,
    override_resolution: Option<u32>,
) -> u32 {
    if let Some(resolution) = override_resolution {
        return resolution;
    }

    let mut resolution = MIN_TOTAL_RESOLUTION;
    for (georef, width, height) in inputs {
        if let Some(res) = image_resolution(georef, width, height) {
            debug!(resolution = res, "Input resolution");
            resolution = resolution.max(res);
        }
    }

    if mode.requires_power_of_two_resolution() {
        resolution = resolution.checked_next_power_of_two().unwrap_or(1 << 31);
    }
    resolution
}

/// Georeference of an input: manual bounds from `options` if given,
/// otherwise the one read from the file.
pub fn make_input_georef(
    name: &str,
    own: Option<Arc<dyn GeoReference>>,
    width: u32,
    height: u32,
    options: &MosaicOptions,
) -> Result<Arc<dyn GeoReference>, ConfigError> {
    if options.has_manual_georef() {
        let (north, south, east, west) = options
            .resolved_bounds()
            .ok_or(ConfigError::IncompleteManualBounds)?;
        debug!(
            image = name,
            north,
            south,
            east,
            west,
            "Using manual georeference"
        );
        return Ok(Arc::new(EquirectGeoReference::from_bounds(
            width, height, north, south, east, west,
        )));
    }

    own.ok_or_else(|| ConfigError::MissingGeoreference(name.to_string()))
}

/// Built-in plate carrée output georeference for `mode`.
///
/// KML and Gigapan use a square extent, 360 degrees on both axes with the
/// top edge at latitude +180, which matches [`crate::mode::longlat_bbox`].
/// TMS, Uniview and Celestia cover ±180 by ±90. Google Maps needs a
/// Mercator projection from the projection engine, and the
/// non-georeferenced mode has no output projection at all.
pub fn global_output_georef(
    mode: Mode,
    xres: u32,
    yres: u32,
) -> Result<EquirectGeoReference, ConfigError> {
    match mode {
        Mode::Kml | Mode::Gigapan => Ok(EquirectGeoReference::from_bounds(
            xres, yres, 180.0, -180.0, 180.0, -180.0,
        )),
        Mode::Tms | Mode::Uniview | Mode::Celestia => Ok(EquirectGeoReference::global(xres, yres)),
        Mode::Gmap | Mode::None => Err(ConfigError::OutputProjectionUnavailable(mode)),
    }
}

/// The output projection of one mosaic run. Fixed before any input is
/// reprojected.
pub struct OutputProjection {
    georef: Box<dyn GeoReference>,
    total_resolution: u32,
    aspect_ratio: u32,
}

impl OutputProjection {
    /// # Errors
    ///
    /// [`ConfigError::InvalidOutputProjection`] if the canvas would have no
    /// columns or rows.
    pub fn new(
        georef: Box<dyn GeoReference>,
        total_resolution: u32,
        aspect_ratio: u32,
    ) -> Result<Self, ConfigError> {
        if aspect_ratio == 0 {
            return Err(ConfigError::InvalidAspectRatio(aspect_ratio));
        }
        if total_resolution / aspect_ratio == 0 {
            return Err(ConfigError::InvalidOutputProjection(format!(
                "total resolution {total_resolution} with aspect ratio {aspect_ratio} leaves no columns"
            )));
        }
        Ok(Self {
            georef,
            total_resolution,
            aspect_ratio,
        })
    }

    pub fn georef(&self) -> &dyn GeoReference {
        self.georef.as_ref()
    }

    /// Pixels around the globe.
    pub fn total_resolution(&self) -> u32 {
        self.total_resolution
    }

    /// Canvas width.
    pub fn xres(&self) -> u32 {
        self.total_resolution / self.aspect_ratio
    }

    /// Canvas height.
    pub fn yres(&self) -> u32 {
        self.total_resolution
    }
}

impl fmt::Debug for OutputProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputProjection")
            .field("proj4", &self.georef.proj4_str())
            .field("total_resolution", &self.total_resolution)
            .field("aspect_ratio", &self.aspect_ratio)
            .finish()
    }
}
