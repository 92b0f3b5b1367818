//! Detection of inputs that cover the whole globe.
//!
//! A global lon/lat image's left and right columns are neighbours on the
//! ground. Warping it with ordinary edge handling leaves a transparent seam
//! at the antimeridian, so such images are sampled with cylindrical edge
//! extension instead.

use crate::geometry::Vector2;
use crate::georef::{GeoReference, LONGLAT_PROJ4};

/// True if `georef` is a plain lon/lat projection whose ±180° meridians and
/// ±90° parallels land within one pixel of the image edges.
pub fn is_global_overlay(georef: &dyn GeoReference, cols: u32, rows: u32) -> bool {
    if georef.proj4_str().trim() != LONGLAT_PROJ4 {
        return false;
    }

    let (cols, rows) = (cols as f64, rows as f64);
    let west = georef.lonlat_to_pixel(Vector2::new(-180.0, 0.0));
    let east = georef.lonlat_to_pixel(Vector2::new(180.0, 0.0));
    let north = georef.lonlat_to_pixel(Vector2::new(0.0, 90.0));
    let south = georef.lonlat_to_pixel(Vector2::new(0.0, -90.0));

    west.x.abs() < 1.0
        && (east.x - cols).abs() < 1.0
        && north.y.abs() < 1.0
        && (south.y - rows).abs() < 1.0
}
