//! Value-level conditioning of an input before it is warped: nodata masking,
//! linear rescaling and normalization.

use crate::source::{MaskedImage, RasterBuffer};
use serde::{Deserialize, Serialize};

/// Turn raw samples into a masked image.
///
/// A pixel whose color channels all equal `nodata` becomes transparent
/// (color and alpha zero). Everything else is opaque. For integer channels
/// the nodata value is truncated to the channel first, so a value outside
/// the channel's range masks nothing.
pub fn mask_nodata(raster: &RasterBuffer, nodata: Option<f32>) -> MaskedImage {
    let mut image = MaskedImage::opaque(raster);
    let Some(nodata) = nodata else {
        return image;
    };

    let nodata = if raster.channel.is_integer() {
        nodata.trunc()
    } else {
        nodata
    };

    let stride = image.stride();
    let channels = raster.format.channels();
    for px in image.data.chunks_exact_mut(stride) {
        if px[..channels].iter().all(|&v| v == nodata) {
            px.fill(0.0);
        }
    }

    image
}

/// `value' = value * scale + offset` on the raw sample, with the result read
/// on the nominal `[0, 1]` scale of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearRescale {
    pub scale: f32,
    pub offset: f32,
}

impl Default for LinearRescale {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
        }
    }
}

impl LinearRescale {
    pub fn new(scale: Option<f32>, offset: Option<f32>) -> Option<Self> {
        if scale.is_none() && offset.is_none() {
            return None;
        }
        Some(Self {
            scale: scale.unwrap_or(1.0),
            offset: offset.unwrap_or(0.0),
        })
    }
}

/// Apply a linear rescale to the color channels, leaving alpha untouched.
///
/// The raw sample is scaled and offset, and the result taken as a nominal
/// value: integer channels multiply it by their maximum and saturate into
/// range, so a `1/255` scale leaves `uint8` data unchanged. Float channels
/// keep the result as is, without clamping.
pub fn apply_rescale(image: &mut MaskedImage, rescale: LinearRescale) {
    let channel = image.channel;
    let full_scale = if channel.is_integer() {
        channel.range().1
    } else {
        1.0
    };
    let channels = image.format.channels();
    let stride = image.stride();

    for px in image.data.chunks_exact_mut(stride) {
        if px[channels] <= 0.0 {
            continue;
        }
        for v in &mut px[..channels] {
            let nominal = *v * rescale.scale + rescale.offset;
            *v = channel.quantize(nominal * full_scale);
        }
    }
}

/// Observed range of valid sample values across all inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub lo: f32,
    pub hi: f32,
}

impl Default for ValueRange {
    /// The empty range, ready to accumulate.
    fn default() -> Self {
        Self {
            lo: f32::MAX,
            hi: f32::MIN,
        }
    }
}

impl ValueRange {
    pub fn new(lo: f32, hi: f32) -> Self {
        Self { lo, hi }
    }

    /// True until at least one sample was included.
    pub fn is_empty(&self) -> bool {
        self.lo > self.hi
    }

    /// Widen the range by the color samples of the non-transparent pixels
    /// of `image`.
    pub fn include(&mut self, image: &MaskedImage) {
        let channels = image.format.channels();
        for px in image.data.chunks_exact(image.stride()) {
            if px[channels] <= 0.0 {
                continue;
            }
            for &v in &px[..channels] {
                if v.is_finite() {
                    self.lo = self.lo.min(v);
                    self.hi = self.hi.max(v);
                }
            }
        }
    }

    /// Range over a set of images.
    pub fn scan<'a>(images: impl IntoIterator<Item = &'a MaskedImage>) -> Self {
        let mut range = Self::default();
        for image in images {
            range.include(image);
        }
        range
    }
}

/// Stretch `range` over the channel's full range, retaining alpha.
///
/// Transparent pixels are left alone. A degenerate range maps every valid
/// sample to the channel minimum.
pub fn normalize_retain_alpha(image: &mut MaskedImage, range: ValueRange) {
    let channel = image.channel;
    let (out_lo, out_hi) = channel.range();
    let span = range.hi - range.lo;
    let channels = image.format.channels();
    let stride = image.stride();

    for px in image.data.chunks_exact_mut(stride) {
        if px[channels] <= 0.0 {
            continue;
        }
        for v in &mut px[..channels] {
            let t = if span > 0.0 { (*v - range.lo) / span } else { 0.0 };
            *v = channel.quantize((out_lo + t * (out_hi - out_lo)).clamp(out_lo, out_hi));
        }
    }
}
