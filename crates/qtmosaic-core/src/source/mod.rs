//! Input raster access.
//!
//! Decoding image files is left to collaborators. Anything that can hand
//! over its dimensions, layout, optional stored nodata value and samples
//! implements [`ImageSource`]:
//!
//! - [`MemorySource`]: samples already in memory
//! - [`DynamicImageSource`]: an `image::DynamicImage` decoded by the caller

mod dynamic;
mod types;

pub use dynamic::{to_dynamic_image, DynamicImageSource};
pub use types::{ChannelType, MaskedImage, PixelFormat, RasterBuffer, SourceError};

pub(crate) use types::layout_name;

/// One input raster of the mosaic.
pub trait ImageSource: Send + Sync {
    /// Name used in log lines and error reports.
    fn name(&self) -> &str;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn format(&self) -> PixelFormat;

    fn channel_type(&self) -> ChannelType;

    /// Nodata value stored in the file, if any.
    fn nodata(&self) -> Option<f32> {
        None
    }

    /// Read all samples.
    fn read(&self) -> Result<RasterBuffer, SourceError>;
}

/// Source backed by a raster already in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    raster: RasterBuffer,
    nodata: Option<f32>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, raster: RasterBuffer) -> Self {
        Self {
            name: name.into(),
            raster,
            nodata: None,
        }
    }

    /// Declare a stored nodata value.
    pub fn with_nodata(mut self, nodata: f32) -> Self {
        self.nodata = Some(nodata);
        self
    }
}

impl ImageSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn width(&self) -> u32 {
        self.raster.width
    }

    fn height(&self) -> u32 {
        self.raster.height
    }

    fn format(&self) -> PixelFormat {
        self.raster.format
    }

    fn channel_type(&self) -> ChannelType {
        self.raster.channel
    }

    fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    fn read(&self) -> Result<RasterBuffer, SourceError> {
        Ok(self.raster.clone())
    }
}
