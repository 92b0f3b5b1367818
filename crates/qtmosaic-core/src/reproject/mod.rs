//! Per-image reprojection stage.
//!
//! Each input goes through the same pipeline before it reaches the
//! composite:
//!
//! 1. Nodata masking (explicit value, else the source's stored one)
//! 2. Linear rescale (`pixel_scale` / `pixel_offset`)
//! 3. Normalization over the value range of all inputs
//! 4. Global-coverage detection
//! 5. Warp into output pixel space, by one of three mutually exclusive paths
//!
//! Steps 1-2 only need the input itself ([`ReprojectionStage::condition`]);
//! step 3 needs the range over *all* conditioned inputs, so the orchestrator
//! scans that in between and hands it back through [`StageConfig`]. Every
//! step reads only shared, immutable state, so inputs can be processed on
//! parallel workers.

mod global;
mod levels;
mod warp;

pub use global::is_global_overlay;
pub use levels::{apply_rescale, mask_nodata, normalize_retain_alpha, LinearRescale, ValueRange};
pub use warp::{warp, EdgeExtension};

use crate::geometry::{BBox2i, GeometryError, Vector2};
use crate::georef::{GeoReference, Transform};
use crate::source::{ChannelType, ImageSource, MaskedImage, PixelFormat, SourceError};
use crate::MosaicError;
use std::sync::Arc;
use tracing::{debug, info};

/// Fraction of the image diagonal beyond which a forward/reverse round trip
/// of the origin counts as the reverse-projection clamping artifact.
const DISCREPANCY_TOLERANCE: f64 = 0.01;

/// Shared, read-only configuration of the stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageConfig {
    /// Working pixel layout every input is converted to.
    pub format: PixelFormat,
    pub channel: ChannelType,
    /// Nodata override; takes precedence over the source's stored value.
    pub nodata: Option<f32>,
    pub rescale: Option<LinearRescale>,
    /// Range to normalize over, computed across all inputs beforehand.
    pub normalize: Option<ValueRange>,
}

/// A reprojected input and where it goes on the canvas.
#[derive(Debug, Clone)]
pub struct PlacedImage {
    /// Pixels covering exactly `bbox`.
    pub image: Arc<MaskedImage>,
    /// Placement in output pixel space.
    pub bbox: BBox2i,
}

impl PlacedImage {
    /// Top-left corner of the placement.
    pub fn offset(&self) -> (i32, i32) {
        (self.bbox.min_x, self.bbox.min_y)
    }
}

/// How an input gets warped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WarpPath {
    /// Whole-globe lon/lat input; sample with cylindrical edge extension.
    Global,
    /// The reverse transform lands a whole period off; sample with the
    /// source shifted right by `shift` pixels.
    Corrected { shift: f64 },
    /// Standard forward transform.
    Direct,
}

/// Pick the warp path for an input of `cols`x`rows` pixels.
///
/// The corrective shift assumes the transform has no rotation; a rotated
/// transform that trips the discrepancy check is shifted anyway and will not
/// be fully corrected.
pub fn select_warp_path(
    transform: &dyn Transform,
    georef: &dyn GeoReference,
    cols: u32,
    rows: u32,
) -> WarpPath {
    if is_global_overlay(georef, cols, rows) {
        return WarpPath::Global;
    }

    let origin = Vector2::default();
    let roundtrip = transform.reverse(transform.forward(origin));
    let discrepancy = roundtrip - origin;
    let diagonal = Vector2::new(cols as f64, rows as f64).norm();

    if discrepancy.norm() > DISCREPANCY_TOLERANCE * diagonal {
        WarpPath::Corrected {
            shift: -discrepancy.x.round(),
        }
    } else {
        WarpPath::Direct
    }
}

/// The reprojection stage for one mosaic run.
#[derive(Debug, Clone, Default)]
pub struct ReprojectionStage {
    config: StageConfig,
}

impl ReprojectionStage {
    pub fn new(config: StageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Install the normalization range once it is known.
    pub fn set_normalize_range(&mut self, range: ValueRange) {
        self.config.normalize = Some(range);
    }

    /// Steps 1-2: read, convert to the working layout, mask nodata and
    /// apply the linear rescale.
    pub fn condition(&self, source: &dyn ImageSource) -> Result<MaskedImage, SourceError> {
        let raster = source
            .read()?
            .convert(self.config.format, self.config.channel);

        let nodata = self.config.nodata.or_else(|| source.nodata());
        if let Some(value) = nodata {
            debug!(image = source.name(), nodata = value, "Using nodata value");
        }
        let mut image = mask_nodata(&raster, nodata);

        if let Some(rescale) = self.config.rescale {
            debug!(
                image = source.name(),
                scale = rescale.scale,
                offset = rescale.offset,
                "Applying input scaling"
            );
            apply_rescale(&mut image, rescale);
        }

        Ok(image)
    }

    /// Steps 3-5: normalize, then warp into output pixel space.
    ///
    /// # Errors
    ///
    /// [`GeometryError::EmptyPlacement`] if the transform maps the image onto
    /// an empty region of the output.
    pub fn place(
        &self,
        name: &str,
        mut image: MaskedImage,
        georef: &dyn GeoReference,
        transform: &dyn Transform,
    ) -> Result<PlacedImage, GeometryError> {
        if let Some(range) = self.config.normalize {
            debug!(
                image = name,
                lo = range.lo,
                hi = range.hi,
                "Applying normalization"
            );
            normalize_retain_alpha(&mut image, range);
        }

        let (cols, rows) = (image.width, image.height);
        let bbox = transform.forward_bbox(BBox2i::new(0, 0, cols as i32, rows as i32));
        if bbox.is_empty() {
            return Err(GeometryError::EmptyPlacement {
                image: name.to_string(),
                bbox,
            });
        }

        let warped = match select_warp_path(transform, georef, cols, rows) {
            WarpPath::Global => {
                info!(
                    image = name,
                    "Detected global overlay, using cylindrical edge extension to hide the seam"
                );
                warp(&image, transform, bbox, EdgeExtension::Cylindrical, 0.0)
            }
            WarpPath::Corrected { shift } => {
                info!(
                    image = name,
                    shift,
                    "Reverse projection lands off by a period, applying corrective shift"
                );
                warp(&image, transform, bbox, EdgeExtension::Zero, shift)
            }
            WarpPath::Direct => warp(&image, transform, bbox, EdgeExtension::Zero, 0.0),
        };

        debug!(image = name, bbox = %bbox, "Placed image");
        Ok(PlacedImage {
            image: Arc::new(warped),
            bbox,
        })
    }

    /// Run all steps for one input.
    pub fn run(
        &self,
        source: &dyn ImageSource,
        georef: &dyn GeoReference,
        transform: &dyn Transform,
    ) -> Result<PlacedImage, MosaicError> {
        let image = self.condition(source)?;
        Ok(self.place(source.name(), image, georef, transform)?)
    }

    /// Non-georeferenced path for an already conditioned image: normalize,
    /// no projection work. The image lands at the origin at its own size.
    pub fn pass_through(&self, mut image: MaskedImage) -> PlacedImage {
        if let Some(range) = self.config.normalize {
            debug!(lo = range.lo, hi = range.hi, "Applying normalization");
            normalize_retain_alpha(&mut image, range);
        }
        let bbox = BBox2i::new(0, 0, image.width as i32, image.height as i32);
        PlacedImage {
            image: Arc::new(image),
            bbox,
        }
    }
}
