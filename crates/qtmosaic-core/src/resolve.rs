//! Final canvas geometry.
//!
//! The canvas is the union of all insertions cropped to the output
//! resolution. Modes whose viewers address tiles on a fixed power-of-two grid
//! additionally snap that box onto the grid so that the top of the tile
//! pyramid lines up with a whole quadtree node.

use crate::geometry::{BBox2i, GeometryError};
use crate::mode::Mode;
use tracing::debug;

/// Crop the union of all insertions to the `xres`x`yres` canvas.
///
/// Pixels that only exist to hide the antimeridian seam fall outside and
/// are dropped.
///
/// # Errors
///
/// [`GeometryError::EmptyTotalBBox`] if nothing is left after cropping.
pub fn total_bbox(union: BBox2i, xres: u32, yres: u32) -> Result<BBox2i, GeometryError> {
    let bbox = union.intersection(&BBox2i::new(0, 0, xres as i32, yres as i32));
    if bbox.is_empty() {
        return Err(GeometryError::EmptyTotalBBox { bbox });
    }
    Ok(bbox)
}

/// Snap `total` onto the power-of-two tile grid anchored at the canvas
/// origin.
///
/// The tile size `dim` is the smallest power of two covering the larger
/// side of `total`, capped at `total_resolution`. The minimum corner is
/// floored to a multiple of `dim`; if the resulting `dim`x`dim` box misses
/// part of `total`, it grows by `dim` on both axes, towards the left (top)
/// when it already touches the right (bottom) canvas edge, else towards the
/// right (bottom).
pub fn align_to_tile_grid(total: BBox2i, total_resolution: u32, xres: u32, yres: u32) -> BBox2i {
    let side = total.width().max(total.height()).max(1) as u32;
    let dim = side.next_power_of_two().min(total_resolution) as i32;

    let mut aligned = BBox2i::new(
        total.min_x.div_euclid(dim) * dim,
        total.min_y.div_euclid(dim) * dim,
        dim,
        dim,
    );

    if !aligned.contains(&total) {
        if aligned.max_x == xres as i32 {
            aligned.min_x -= dim;
        } else {
            aligned.max_x += dim;
        }
        if aligned.max_y == yres as i32 {
            aligned.min_y -= dim;
        } else {
            aligned.max_y += dim;
        }
    }

    debug!(total = %total, aligned = %aligned, dim, "Aligned canvas bbox to tile grid");
    aligned
}

/// The bbox the composite is prepared over for `mode`.
pub fn resolve_canvas_bbox(
    union: BBox2i,
    mode: Mode,
    total_resolution: u32,
    xres: u32,
    yres: u32,
) -> Result<BBox2i, GeometryError> {
    let total = total_bbox(union, xres, yres)?;
    if mode.requires_aligned_bbox() {
        Ok(align_to_tile_grid(total, total_resolution, xres, yres))
    } else {
        Ok(total)
    }
}
