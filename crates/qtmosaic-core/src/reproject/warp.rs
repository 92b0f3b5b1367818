//! Resampling an image through a [`Transform`] into output pixel space.
//!
//! Warping uses inverse mapping: for each output pixel inside the placement
//! bbox, the transform's reverse gives the source coordinate, which is
//! sampled with bilinear interpolation. Integer source coordinates sample
//! exactly, so an identity transform reproduces its input bit for bit.

use crate::geometry::{BBox2i, Vector2};
use crate::georef::Transform;
use crate::source::MaskedImage;

/// Source coordinates within this distance of an integer sample exactly.
const SAMPLE_SNAP: f64 = 1e-9;

/// What a sample outside the source image reads as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeExtension {
    /// Fully transparent.
    #[default]
    Zero,
    /// Columns wrap around horizontally, rows clamp to the top/bottom edge.
    Cylindrical,
}

/// Warp `image` into `bbox` of the output space.
///
/// `shift_x` is added to every reverse-mapped x coordinate before sampling;
/// it is zero except for the corrective-shift path.
pub fn warp(
    image: &MaskedImage,
    transform: &dyn Transform,
    bbox: BBox2i,
    edge: EdgeExtension,
    shift_x: f64,
) -> MaskedImage {
    let width = bbox.width().max(0) as u32;
    let height = bbox.height().max(0) as u32;
    let mut output = MaskedImage::transparent(width, height, image.format, image.channel);
    let stride = output.stride();

    for j in 0..height {
        for i in 0..width {
            let dst = Vector2::new(
                (bbox.min_x + i as i32) as f64,
                (bbox.min_y + j as i32) as f64,
            );
            let src = transform.reverse(dst);
            if !src.x.is_finite() || !src.y.is_finite() {
                continue;
            }

            let idx = (j as usize * width as usize + i as usize) * stride;
            let out = &mut output.data[idx..idx + stride];
            sample_bilinear(image, src.x + shift_x, src.y, edge, out);
        }
    }

    output
}

/// Fetch a pixel with edge extension, or `None` for a transparent read.
#[inline]
fn fetch(image: &MaskedImage, x: i64, y: i64, edge: EdgeExtension) -> Option<&[f32]> {
    let (w, h) = (image.width as i64, image.height as i64);
    match edge {
        EdgeExtension::Zero => {
            if x < 0 || x >= w || y < 0 || y >= h {
                None
            } else {
                Some(image.pixel(x as u32, y as u32))
            }
        }
        EdgeExtension::Cylindrical => {
            let x = x.rem_euclid(w);
            let y = y.clamp(0, h - 1);
            Some(image.pixel(x as u32, y as u32))
        }
    }
}

#[inline]
fn snap(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < SAMPLE_SNAP {
        r
    } else {
        v
    }
}

/// Bilinear sample of all channels, alpha included, into `out`.
fn sample_bilinear(image: &MaskedImage, x: f64, y: f64, edge: EdgeExtension, out: &mut [f32]) {
    let (x, y) = (snap(x), snap(y));
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1, y0, fx * (1.0 - fy)),
        (x0, y0 + 1, (1.0 - fx) * fy),
        (x0 + 1, y0 + 1, fx * fy),
    ];

    out.fill(0.0);
    for (tx, ty, weight) in taps {
        if weight == 0.0 {
            continue;
        }
        if let Some(px) = fetch(image, tx, ty, edge) {
            for (o, &v) in out.iter_mut().zip(px) {
                *o += (v as f64 * weight) as f32;
            }
        }
    }

    if image.channel.is_integer() {
        for v in out.iter_mut() {
            *v = image.channel.quantize(*v);
        }
    }
}
