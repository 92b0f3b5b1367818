//! Pixel-space and geographic bounding boxes.
//!
//! All mosaic geometry is expressed in output pixel coordinates with the
//! origin at the top-left corner. Integer boxes are half-open: `max_x` and
//! `max_y` are one past the last covered column/row.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use thiserror::Error;

/// Geometry failures. These always abort the mosaic run: they mean the
/// georeference math upstream produced an empty region.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// A reprojected input covers no output pixels.
    #[error("Placement bbox {bbox} of image '{image}' is empty. Georeference calculation is probably incorrect.")]
    EmptyPlacement { image: String, bbox: BBox2i },

    /// The union of all insertions, cropped to the output canvas, is empty.
    #[error("Total bbox {bbox} is empty. Georeference calculation is probably incorrect.")]
    EmptyTotalBBox { bbox: BBox2i },

    /// The prepared composite has no rows or columns.
    #[error("Composite image is empty ({cols}x{rows}). Georeference calculation is probably incorrect.")]
    EmptyCanvas { cols: i64, rows: i64 },
}

/// A 2D point or offset in pixel or lon/lat space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length.
    #[inline]
    pub fn norm(self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl Add for Vector2 {
    type Output = Vector2;

    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2 {
    type Output = Vector2;

    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Integer pixel bounding box, half-open on the max side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BBox2i {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl BBox2i {
    /// Create a box from its top-left corner and size.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + width,
            max_y: y + height,
        }
    }

    /// Create a box from its corners.
    pub const fn from_corners(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.max_y - self.min_y
    }

    /// True if the box covers no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Number of covered pixels (zero for empty boxes).
    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width() as i64 * self.height() as i64
        }
    }

    /// True if `other` lies entirely inside this box.
    pub fn contains(&self, other: &BBox2i) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    /// Intersection of two boxes.
    ///
    /// Disjoint boxes produce a zero-area box anchored at the clamped corner
    /// rather than a box with inverted corners.
    pub fn intersection(&self, other: &BBox2i) -> BBox2i {
        let min_x = self.min_x.max(other.min_x);
        let min_y = self.min_y.max(other.min_y);
        let max_x = self.max_x.min(other.max_x).max(min_x);
        let max_y = self.max_y.min(other.max_y).max(min_y);
        BBox2i::from_corners(min_x, min_y, max_x, max_y)
    }

    /// Smallest box containing both boxes. Empty operands are ignored.
    pub fn union(&self, other: &BBox2i) -> BBox2i {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        BBox2i::from_corners(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// The box moved by `(dx, dy)`.
    pub fn translate(&self, dx: i32, dy: i32) -> BBox2i {
        BBox2i::from_corners(
            self.min_x + dx,
            self.min_y + dy,
            self.max_x + dx,
            self.max_y + dy,
        )
    }
}

impl fmt::Display for BBox2i {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}]-[{}, {}] ({}x{})",
            self.min_x,
            self.min_y,
            self.max_x,
            self.max_y,
            self.width(),
            self.height()
        )
    }
}

/// Floating-point bounding box, used for lon/lat footprints.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox2 {
    pub min: Vector2,
    pub max: Vector2,
}

impl BBox2 {
    /// Create a box from its minimum corner and size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            min: Vector2::new(x, y),
            max: Vector2::new(x + width, y + height),
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}
