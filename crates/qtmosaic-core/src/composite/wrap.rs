//! Insertion across the antimeridian.
//!
//! The output canvas is `total_resolution` pixels around the globe, of which
//! the first `xres` columns are the canvas proper. An image whose placement
//! runs past the right edge of the globe also shows up on the left side, so
//! it is inserted a second time shifted one full turn to the left.

use super::canvas::ImageComposite;
use crate::geometry::BBox2i;
use crate::reproject::PlacedImage;
use crate::source::SourceError;
use tracing::debug;

/// Canvas offsets at which an image placed at `bbox` must be inserted.
///
/// At most two: the shifted copy (when the right edge passes
/// `total_resolution`) followed by the original placement (when the left
/// edge is left of `xres`).
pub fn plan_insertions(bbox: BBox2i, total_resolution: u32, xres: u32) -> Vec<(i32, i32)> {
    let resolution = total_resolution as i32;
    let mut offsets = Vec::with_capacity(2);

    if bbox.max_x > resolution {
        offsets.push((bbox.min_x - resolution, bbox.min_y));
    }
    if bbox.min_x < xres as i32 {
        offsets.push((bbox.min_x, bbox.min_y));
    }

    offsets
}

/// Insert `placed` into `composite`, duplicating it across the seam as
/// needed. Returns the number of insertions made.
pub fn insert_wrapped(
    composite: &mut ImageComposite,
    placed: &PlacedImage,
    total_resolution: u32,
    xres: u32,
) -> Result<usize, SourceError> {
    let offsets = plan_insertions(placed.bbox, total_resolution, xres);
    if offsets.len() > 1 {
        debug!(bbox = %placed.bbox, "Image straddles the seam, inserting on both sides");
    }
    for &(x, y) in &offsets {
        composite.insert(placed.image.clone(), x, y)?;
    }
    Ok(offsets.len())
}
