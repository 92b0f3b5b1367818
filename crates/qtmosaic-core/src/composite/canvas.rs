//! The accumulating multi-image canvas.
//!
//! Insertions are only recorded while the composite is open. `prepare`
//! consumes the [`ImageComposite`] and renders every insertion into a
//! [`PreparedComposite`] covering exactly the requested bbox, so nothing can
//! be inserted after preparation.

use super::progress::ProgressCallback;
use crate::geometry::{BBox2i, GeometryError};
use crate::source::{layout_name, ChannelType, MaskedImage, PixelFormat, SourceError};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// How overlapping insertions combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    /// Later insertions are composited over earlier ones; opaque pixels
    /// simply replace what was there.
    #[default]
    Draft,
    /// Overlaps are averaged, each insertion weighted by its alpha times the
    /// pixel's distance to the insertion's edge. Independent of insertion
    /// order.
    Multiband,
}

/// One image placed on the canvas.
#[derive(Debug, Clone)]
pub struct Insertion {
    pub image: Arc<MaskedImage>,
    pub x: i32,
    pub y: i32,
}

impl Insertion {
    pub fn bbox(&self) -> BBox2i {
        BBox2i::new(
            self.x,
            self.y,
            self.image.width as i32,
            self.image.height as i32,
        )
    }
}

/// Canvas accepting insertions.
#[derive(Debug, Clone)]
pub struct ImageComposite {
    format: PixelFormat,
    channel: ChannelType,
    blend: BlendMode,
    insertions: Vec<Insertion>,
}

impl ImageComposite {
    pub fn new(format: PixelFormat, channel: ChannelType, blend: BlendMode) -> Self {
        Self {
            format,
            channel,
            blend,
            insertions: Vec::new(),
        }
    }

    /// Place `image` with its top-left corner at `(x, y)`.
    ///
    /// # Errors
    ///
    /// [`SourceError::LayoutMismatch`] if the image's pixel layout differs
    /// from the composite's.
    pub fn insert(&mut self, image: Arc<MaskedImage>, x: i32, y: i32) -> Result<(), SourceError> {
        if image.format != self.format || image.channel != self.channel {
            return Err(SourceError::LayoutMismatch {
                expected: layout_name(self.format, self.channel),
                actual: image.layout(),
            });
        }
        self.insertions.push(Insertion { image, x, y });
        Ok(())
    }

    pub fn insertions(&self) -> &[Insertion] {
        &self.insertions
    }

    pub fn len(&self) -> usize {
        self.insertions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty()
    }

    /// Union of all insertion boxes.
    pub fn bbox(&self) -> BBox2i {
        self.insertions
            .iter()
            .fold(BBox2i::default(), |acc, ins| acc.union(&ins.bbox()))
    }

    /// Render all insertions over exactly `bbox`.
    ///
    /// # Errors
    ///
    /// [`GeometryError::EmptyCanvas`] if `bbox` has no rows or columns.
    pub fn prepare(
        self,
        bbox: BBox2i,
        progress: &dyn ProgressCallback,
    ) -> Result<PreparedComposite, GeometryError> {
        if bbox.is_empty() {
            return Err(GeometryError::EmptyCanvas {
                cols: bbox.width() as i64,
                rows: bbox.height() as i64,
            });
        }

        info!(
            bbox = %bbox,
            insertions = self.insertions.len(),
            blend = ?self.blend,
            "Preparing composite"
        );

        let (cols, rows) = (bbox.width() as u32, bbox.height() as u32);
        let mut canvas = MaskedImage::transparent(cols, rows, self.format, self.channel);

        progress.report(0.0);
        match self.blend {
            BlendMode::Draft => render_draft(&mut canvas, bbox, &self.insertions, progress),
            BlendMode::Multiband => render_multiband(&mut canvas, bbox, &self.insertions, progress),
        }
        progress.report(1.0);

        let local = BBox2i::new(0, 0, bbox.width(), bbox.height());
        let data_bbox = self
            .insertions
            .iter()
            .map(|ins| ins.bbox().translate(-bbox.min_x, -bbox.min_y))
            .fold(BBox2i::default(), |acc, b| acc.union(&b))
            .intersection(&local);

        debug!(data_bbox = %data_bbox, "Composite prepared");
        Ok(PreparedComposite {
            bbox,
            data_bbox,
            image: canvas,
        })
    }
}

fn render_draft(
    canvas: &mut MaskedImage,
    bbox: BBox2i,
    insertions: &[Insertion],
    progress: &dyn ProgressCallback,
) {
    let channels = canvas.format.channels();
    let opaque = canvas.channel.opaque();
    let channel = canvas.channel;

    for (n, ins) in insertions.iter().enumerate() {
        let region = ins.bbox().intersection(&bbox);
        for y in region.min_y..region.max_y {
            for x in region.min_x..region.max_x {
                let src = ins.image.pixel((x - ins.x) as u32, (y - ins.y) as u32);
                let a_src = src[channels] / opaque;
                if a_src <= 0.0 {
                    continue;
                }

                let dst = canvas.pixel_mut((x - bbox.min_x) as u32, (y - bbox.min_y) as u32);
                if a_src >= 1.0 {
                    dst.copy_from_slice(src);
                    continue;
                }

                // Straight-alpha "over".
                let a_dst = dst[channels] / opaque;
                let a_out = a_src + a_dst * (1.0 - a_src);
                for c in 0..channels {
                    let v = (src[c] * a_src + dst[c] * a_dst * (1.0 - a_src)) / a_out;
                    dst[c] = channel.quantize(v);
                }
                dst[channels] = channel.quantize(a_out * opaque);
            }
        }
        progress.report((n + 1) as f64 / insertions.len() as f64);
    }
}

fn render_multiband(
    canvas: &mut MaskedImage,
    bbox: BBox2i,
    insertions: &[Insertion],
    progress: &dyn ProgressCallback,
) {
    let stride = canvas.stride();
    let channels = canvas.format.channels();
    let opaque = canvas.channel.opaque();
    let channel = canvas.channel;
    let width = canvas.width as usize;

    let mut sums = vec![0.0f64; canvas.data.len()];
    let mut weights = vec![0.0f64; canvas.width as usize * canvas.height as usize];

    for (n, ins) in insertions.iter().enumerate() {
        let (iw, ih) = (ins.image.width as i32, ins.image.height as i32);
        let region = ins.bbox().intersection(&bbox);
        for y in region.min_y..region.max_y {
            for x in region.min_x..region.max_x {
                let (lx, ly) = (x - ins.x, y - ins.y);
                let src = ins.image.pixel(lx as u32, ly as u32);
                let alpha = (src[channels] / opaque) as f64;
                if alpha <= 0.0 {
                    continue;
                }

                let edge = (lx + 1).min(iw - lx).min(ly + 1).min(ih - ly) as f64;
                let weight = alpha * edge;

                let pixel = (y - bbox.min_y) as usize * width + (x - bbox.min_x) as usize;
                let acc = &mut sums[pixel * stride..(pixel + 1) * stride];
                for (a, &v) in acc.iter_mut().zip(src) {
                    *a += v as f64 * weight;
                }
                weights[pixel] += weight;
            }
        }
        progress.report((n + 1) as f64 / insertions.len() as f64);
    }

    for (pixel, &weight) in weights.iter().enumerate() {
        if weight <= 0.0 {
            continue;
        }
        let out = &mut canvas.data[pixel * stride..(pixel + 1) * stride];
        let sum = &sums[pixel * stride..(pixel + 1) * stride];
        for (o, &s) in out.iter_mut().zip(sum) {
            *o = channel.quantize((s / weight) as f32);
        }
    }
}

/// Finished canvas, handed to the tile generator.
#[derive(Debug, Clone)]
pub struct PreparedComposite {
    bbox: BBox2i,
    data_bbox: BBox2i,
    image: MaskedImage,
}

impl PreparedComposite {
    /// The bbox the canvas was prepared over, in output pixel space.
    pub fn bbox(&self) -> BBox2i {
        self.bbox
    }

    /// Extent of the inserted data, shifted so that `bbox()`'s minimum
    /// corner is the origin and cropped to the canvas size.
    pub fn data_bbox(&self) -> BBox2i {
        self.data_bbox
    }

    pub fn cols(&self) -> u32 {
        self.image.width
    }

    pub fn rows(&self) -> u32 {
        self.image.height
    }

    pub fn image(&self) -> &MaskedImage {
        &self.image
    }

    /// Render into an `image::DynamicImage` with alpha for encoding.
    pub fn to_dynamic_image(&self) -> Result<DynamicImage, SourceError> {
        crate::source::to_dynamic_image(&self.image)
    }
}
