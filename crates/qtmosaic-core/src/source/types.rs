//! Core pixel types shared by the reprojection stage and the composite.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error types for pixel source operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// Sample buffer length doesn't match the declared dimensions.
    #[error("Invalid pixel data: expected {expected} samples, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Width or height is zero.
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// The pixel layout has no counterpart in the working representation.
    #[error("Unsupported pixel layout: {0}")]
    UnsupportedLayout(String),

    /// An insertion doesn't match the composite's pixel layout.
    #[error("Pixel layout mismatch: composite is {expected}, image is {actual}")]
    LayoutMismatch { expected: String, actual: String },

    /// The underlying reader failed.
    #[error("Failed to read '{name}': {reason}")]
    Read { name: String, reason: String },
}

/// Color layout of a raster, not counting the alpha channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Single gray channel.
    #[default]
    Gray,
    /// Red, green, blue.
    Rgb,
}

impl PixelFormat {
    /// Number of color channels.
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgb => 3,
        }
    }
}

/// Numeric type of a pixel channel.
///
/// Samples are carried as `f32` everywhere, but hold values in the native
/// range of their channel type so that normalization, rescaling and the
/// final handoff agree on what "full scale" means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    #[default]
    Uint8,
    Int16,
    Uint16,
    #[serde(rename = "float")]
    Float32,
}

impl ChannelType {
    /// Native (min, max) range of the channel.
    pub fn range(self) -> (f32, f32) {
        match self {
            ChannelType::Uint8 => (0.0, u8::MAX as f32),
            ChannelType::Int16 => (i16::MIN as f32, i16::MAX as f32),
            ChannelType::Uint16 => (0.0, u16::MAX as f32),
            ChannelType::Float32 => (0.0, 1.0),
        }
    }

    /// Alpha value of a fully opaque pixel.
    #[inline]
    pub fn opaque(self) -> f32 {
        self.range().1
    }

    #[inline]
    pub fn is_integer(self) -> bool {
        !matches!(self, ChannelType::Float32)
    }

    /// Quantize a computed value into this channel: integer channels round
    /// and saturate, floats pass through.
    #[inline]
    pub fn quantize(self, value: f32) -> f32 {
        if self.is_integer() {
            let (lo, hi) = self.range();
            value.round().clamp(lo, hi)
        } else {
            value
        }
    }

    /// Convert a value of this channel type into `target`, mapping full
    /// scale onto full scale.
    pub fn rescale_to(self, value: f32, target: ChannelType) -> f32 {
        if self == target {
            return value;
        }
        let (src_lo, src_hi) = self.range();
        let (dst_lo, dst_hi) = target.range();
        let t = (value - src_lo) / (src_hi - src_lo);
        target.quantize(dst_lo + t * (dst_hi - dst_lo))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelType::Uint8 => "uint8",
            ChannelType::Int16 => "int16",
            ChannelType::Uint16 => "uint16",
            ChannelType::Float32 => "float",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uint8" => Ok(ChannelType::Uint8),
            "int16" => Ok(ChannelType::Int16),
            "uint16" => Ok(ChannelType::Uint16),
            "float" | "float32" => Ok(ChannelType::Float32),
            other => Err(format!("unknown channel type '{other}'")),
        }
    }
}

/// Raw samples read from a source, color channels only.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBuffer {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub channel: ChannelType,
    /// Row-major samples, `format.channels()` per pixel.
    pub samples: Vec<f32>,
}

impl RasterBuffer {
    /// Create a buffer, validating its size.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        channel: ChannelType,
        samples: Vec<f32>,
    ) -> Result<Self, SourceError> {
        if width == 0 || height == 0 {
            return Err(SourceError::InvalidDimensions { width, height });
        }
        let expected = width as usize * height as usize * format.channels();
        if samples.len() != expected {
            return Err(SourceError::SizeMismatch {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            channel,
            samples,
        })
    }

    /// Convert to another layout.
    ///
    /// Gray expands to RGB by replication; RGB reduces to gray with the
    /// Rec. 601 weights. Channel values are rescaled full scale to full scale.
    pub fn convert(self, format: PixelFormat, channel: ChannelType) -> RasterBuffer {
        if self.format == format && self.channel == channel {
            return self;
        }

        let src_channels = self.format.channels();
        let mut samples = Vec::with_capacity(self.samples.len() / src_channels * format.channels());
        for px in self.samples.chunks_exact(src_channels) {
            match (self.format, format) {
                (PixelFormat::Gray, PixelFormat::Rgb) => {
                    let v = self.channel.rescale_to(px[0], channel);
                    samples.extend_from_slice(&[v, v, v]);
                }
                (PixelFormat::Rgb, PixelFormat::Gray) => {
                    let gray = 0.299 * px[0] + 0.587 * px[1] + 0.114 * px[2];
                    let gray = self.channel.quantize(gray);
                    samples.push(self.channel.rescale_to(gray, channel));
                }
                _ => samples.extend(px.iter().map(|&v| self.channel.rescale_to(v, channel))),
            }
        }

        RasterBuffer {
            width: self.width,
            height: self.height,
            format,
            channel,
            samples,
        }
    }
}

/// Image with an alpha channel, the working representation of the
/// compositor.
///
/// Each pixel holds `format.channels()` color samples followed by one alpha
/// sample, all in the native range of `channel`. Alpha 0 is transparent,
/// `channel.opaque()` is fully opaque.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub channel: ChannelType,
    pub data: Vec<f32>,
}

impl MaskedImage {
    /// A fully transparent image.
    pub fn transparent(width: u32, height: u32, format: PixelFormat, channel: ChannelType) -> Self {
        let stride = format.channels() + 1;
        Self {
            width,
            height,
            format,
            channel,
            data: vec![0.0; width as usize * height as usize * stride],
        }
    }

    /// Attach an opaque alpha channel to raw samples.
    pub fn opaque(raster: &RasterBuffer) -> Self {
        let channels = raster.format.channels();
        let alpha = raster.channel.opaque();
        let mut data = Vec::with_capacity(raster.samples.len() / channels * (channels + 1));
        for px in raster.samples.chunks_exact(channels) {
            data.extend_from_slice(px);
            data.push(alpha);
        }
        Self {
            width: raster.width,
            height: raster.height,
            format: raster.format,
            channel: raster.channel,
            data,
        }
    }

    /// Samples per pixel, including alpha.
    #[inline]
    pub fn stride(&self) -> usize {
        self.format.channels() + 1
    }

    /// Index of the alpha sample within a pixel.
    #[inline]
    pub fn alpha_index(&self) -> usize {
        self.format.channels()
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> &[f32] {
        let stride = self.stride();
        let idx = (y as usize * self.width as usize + x as usize) * stride;
        &self.data[idx..idx + stride]
    }

    #[inline]
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [f32] {
        let stride = self.stride();
        let idx = (y as usize * self.width as usize + x as usize) * stride;
        &mut self.data[idx..idx + stride]
    }

    #[inline]
    pub fn alpha(&self, x: u32, y: u32) -> f32 {
        self.pixel(x, y)[self.alpha_index()]
    }

    /// Check if this is an empty image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Human-readable layout, e.g. `rgb/uint8`.
    pub fn layout(&self) -> String {
        layout_name(self.format, self.channel)
    }
}

pub(crate) fn layout_name(format: PixelFormat, channel: ChannelType) -> String {
    let format = match format {
        PixelFormat::Gray => "gray",
        PixelFormat::Rgb => "rgb",
    };
    format!("{format}/{channel}")
}
