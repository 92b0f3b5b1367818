//! Adapter between the `image` crate and the compositor's pixel types.
//!
//! Inputs come in as `image::DynamicImage`; the finished canvas goes back
//! out as one, with its alpha channel, for the tile encoder.

use super::types::{ChannelType, MaskedImage, PixelFormat, RasterBuffer, SourceError};
use super::ImageSource;
use image::{DynamicImage, ImageBuffer};

/// [`ImageSource`] over an already decoded `image::DynamicImage`.
///
/// Alpha channels of the decoded image are dropped; transparency in the
/// mosaic comes from nodata masking and warping only.
#[derive(Debug, Clone)]
pub struct DynamicImageSource {
    name: String,
    image: DynamicImage,
    format: PixelFormat,
    channel: ChannelType,
    nodata: Option<f32>,
}

impl DynamicImageSource {
    /// Wrap a decoded image.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::UnsupportedLayout`] for layouts without a
    /// gray/RGB counterpart (e.g. 32-bit float gray, which `image` doesn't
    /// represent).
    pub fn new(name: impl Into<String>, image: DynamicImage) -> Result<Self, SourceError> {
        let (format, channel) = match &image {
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageLumaA8(_) => {
                (PixelFormat::Gray, ChannelType::Uint8)
            }
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
                (PixelFormat::Rgb, ChannelType::Uint8)
            }
            DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA16(_) => {
                (PixelFormat::Gray, ChannelType::Uint16)
            }
            DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgba16(_) => {
                (PixelFormat::Rgb, ChannelType::Uint16)
            }
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                (PixelFormat::Rgb, ChannelType::Float32)
            }
            other => {
                return Err(SourceError::UnsupportedLayout(format!(
                    "{:?}",
                    other.color()
                )));
            }
        };

        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(SourceError::InvalidDimensions { width, height });
        }

        Ok(Self {
            name: name.into(),
            image,
            format,
            channel,
            nodata: None,
        })
    }

    /// Declare a nodata value, as a GeoTIFF's GDAL_NODATA tag would.
    pub fn with_nodata(mut self, nodata: f32) -> Self {
        self.nodata = Some(nodata);
        self
    }
}

impl ImageSource for DynamicImageSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn channel_type(&self) -> ChannelType {
        self.channel
    }

    fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    fn read(&self) -> Result<RasterBuffer, SourceError> {
        let samples: Vec<f32> = match (self.format, self.channel) {
            (PixelFormat::Gray, ChannelType::Uint8) => {
                self.image.to_luma8().into_raw().into_iter().map(f32::from).collect()
            }
            (PixelFormat::Gray, ChannelType::Uint16) => {
                self.image.to_luma16().into_raw().into_iter().map(f32::from).collect()
            }
            (PixelFormat::Rgb, ChannelType::Uint8) => {
                self.image.to_rgb8().into_raw().into_iter().map(f32::from).collect()
            }
            (PixelFormat::Rgb, ChannelType::Uint16) => {
                self.image.to_rgb16().into_raw().into_iter().map(f32::from).collect()
            }
            (PixelFormat::Rgb, ChannelType::Float32) => self.image.to_rgb32f().into_raw(),
            (format, channel) => {
                return Err(SourceError::UnsupportedLayout(super::layout_name(
                    format,
                    channel,
                )));
            }
        };

        RasterBuffer::new(
            self.width(),
            self.height(),
            self.format,
            self.channel,
            samples,
        )
    }
}

/// Render a masked image into an `image::DynamicImage` with alpha.
///
/// Integer channels are converted with saturation. Gray float canvases are
/// expanded to RGBA float since `image` has no gray float layout; signed
/// 16-bit canvases have no `image` counterpart and are rejected.
pub fn to_dynamic_image(image: &MaskedImage) -> Result<DynamicImage, SourceError> {
    let (width, height) = (image.width, image.height);
    let size_error = || SourceError::SizeMismatch {
        expected: width as usize * height as usize * image.stride(),
        actual: image.data.len(),
    };

    match (image.format, image.channel) {
        (PixelFormat::Gray, ChannelType::Uint8) => {
            let raw = image.data.iter().map(|&v| v.round().clamp(0.0, 255.0) as u8).collect();
            ImageBuffer::from_raw(width, height, raw)
                .map(DynamicImage::ImageLumaA8)
                .ok_or_else(size_error)
        }
        (PixelFormat::Rgb, ChannelType::Uint8) => {
            let raw = image.data.iter().map(|&v| v.round().clamp(0.0, 255.0) as u8).collect();
            ImageBuffer::from_raw(width, height, raw)
                .map(DynamicImage::ImageRgba8)
                .ok_or_else(size_error)
        }
        (PixelFormat::Gray, ChannelType::Uint16) => {
            let raw = image.data.iter().map(|&v| v.round().clamp(0.0, 65535.0) as u16).collect();
            ImageBuffer::from_raw(width, height, raw)
                .map(DynamicImage::ImageLumaA16)
                .ok_or_else(size_error)
        }
        (PixelFormat::Rgb, ChannelType::Uint16) => {
            let raw = image.data.iter().map(|&v| v.round().clamp(0.0, 65535.0) as u16).collect();
            ImageBuffer::from_raw(width, height, raw)
                .map(DynamicImage::ImageRgba16)
                .ok_or_else(size_error)
        }
        (PixelFormat::Rgb, ChannelType::Float32) => {
            ImageBuffer::from_raw(width, height, image.data.clone())
                .map(DynamicImage::ImageRgba32F)
                .ok_or_else(size_error)
        }
        (PixelFormat::Gray, ChannelType::Float32) => {
            let raw = image
                .data
                .chunks_exact(2)
                .flat_map(|px| [px[0], px[0], px[0], px[1]])
                .collect();
            ImageBuffer::from_raw(width, height, raw)
                .map(DynamicImage::ImageRgba32F)
                .ok_or_else(size_error)
        }
        (format, channel) => Err(SourceError::UnsupportedLayout(super::layout_name(
            format, channel,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn test_gray8_source() {
        let img = GrayImage::from_fn(4, 3, |x, y| Luma([(x + y * 4) as u8]));
        let source = DynamicImageSource::new("gray.png", DynamicImage::ImageLuma8(img)).unwrap();

        assert_eq!(source.format(), PixelFormat::Gray);
        assert_eq!(source.channel_type(), ChannelType::Uint8);
        let raster = source.read().unwrap();
        assert_eq!(raster.samples.len(), 12);
        assert_eq!(raster.samples[5], 5.0);
    }

    #[test]
    fn test_rgb8_source_with_nodata() {
        let img = RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]));
        let source = DynamicImageSource::new("rgb.png", DynamicImage::ImageRgb8(img))
            .unwrap()
            .with_nodata(0.0);

        assert_eq!(source.nodata(), Some(0.0));
        let raster = source.read().unwrap();
        assert_eq!(raster.format, PixelFormat::Rgb);
        assert_eq!(&raster.samples[..3], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_empty_image_rejected() {
        let img = GrayImage::new(0, 5);
        let err = DynamicImageSource::new("empty.png", DynamicImage::ImageLuma8(img)).unwrap_err();
        assert!(matches!(err, SourceError::InvalidDimensions { .. }));
    }

    #[test]
    fn test_to_dynamic_image_rgba8() {
        let mut canvas = MaskedImage::transparent(2, 1, PixelFormat::Rgb, ChannelType::Uint8);
        canvas.pixel_mut(1, 0).copy_from_slice(&[10.0, 20.0, 300.0, 255.0]);

        let out = to_dynamic_image(&canvas).unwrap();
        let rgba = out.as_rgba8().unwrap();
        assert_eq!(rgba.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(rgba.get_pixel(1, 0).0, [10, 20, 255, 255]);
    }

    #[test]
    fn test_to_dynamic_image_gray_float() {
        let mut canvas = MaskedImage::transparent(1, 1, PixelFormat::Gray, ChannelType::Float32);
        canvas.pixel_mut(0, 0).copy_from_slice(&[0.25, 1.0]);

        let out = to_dynamic_image(&canvas).unwrap();
        assert_eq!(
            out.as_rgba32f().unwrap().get_pixel(0, 0).0,
            [0.25, 0.25, 0.25, 1.0]
        );
    }

    #[test]
    fn test_to_dynamic_image_int16_rejected() {
        let canvas = MaskedImage::transparent(1, 1, PixelFormat::Gray, ChannelType::Int16);
        assert!(matches!(
            to_dynamic_image(&canvas),
            Err(SourceError::UnsupportedLayout(_))
        ));
    }
}
