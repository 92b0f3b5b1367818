//! Georeferences and the pixel-to-pixel transforms built from them.
//!
//! The projection engine itself is an external collaborator: anything that
//! can map pixels to lon/lat and back implements [`GeoReference`]. The
//! compositor only ever talks to the [`Transform`] trait, so tests and
//! callers can plug in their own forward/reverse mappings.
//!
//! # Pixel convention
//!
//! Pixel `(0, 0)` is the top-left corner of the top-left pixel. An image of
//! `cols` columns spans pixel x coordinates `[0, cols]`, so a global
//! lon/lat image maps longitude -180 to x = 0 and +180 to x = cols.

use crate::geometry::{BBox2i, Vector2};

/// Proj4 string of a plain geographic (lon/lat) projection.
pub const LONGLAT_PROJ4: &str = "+proj=longlat";

/// Coordinates within this distance of an integer are treated as that integer
/// when rounding to whole pixels.
const SNAP_EPSILON: f64 = 1e-6;

/// Mapping between an image's pixel grid and geographic coordinates.
pub trait GeoReference: Send + Sync {
    /// Proj4 description of the projected coordinate system.
    fn proj4_str(&self) -> &str;

    /// Convert a pixel coordinate to (longitude, latitude) in degrees.
    fn pixel_to_lonlat(&self, pixel: Vector2) -> Vector2;

    /// Convert (longitude, latitude) in degrees to a pixel coordinate.
    fn lonlat_to_pixel(&self, lonlat: Vector2) -> Vector2;
}

/// Forward/reverse pixel mapping from a source image into the output canvas.
pub trait Transform: Send + Sync {
    /// Source pixel to output pixel.
    fn forward(&self, pixel: Vector2) -> Vector2;

    /// Output pixel to source pixel.
    fn reverse(&self, pixel: Vector2) -> Vector2;

    /// Output-space box enclosing the forward image of `bbox`.
    ///
    /// The default walks the perimeter of `bbox` one pixel at a time, so
    /// curved edges are captured, and grows the result to whole pixels.
    fn forward_bbox(&self, bbox: BBox2i) -> BBox2i {
        if bbox.is_empty() {
            return BBox2i::from_corners(bbox.min_x, bbox.min_y, bbox.min_x, bbox.min_y);
        }

        let mut min = Vector2::new(f64::INFINITY, f64::INFINITY);
        let mut max = Vector2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        let mut include = |p: Vector2| {
            let q = self.forward(p);
            if q.x.is_finite() && q.y.is_finite() {
                min.x = min.x.min(q.x);
                min.y = min.y.min(q.y);
                max.x = max.x.max(q.x);
                max.y = max.y.max(q.y);
            }
        };

        let (x0, y0) = (bbox.min_x as f64, bbox.min_y as f64);
        let (x1, y1) = (bbox.max_x as f64, bbox.max_y as f64);
        for x in bbox.min_x..=bbox.max_x {
            include(Vector2::new(x as f64, y0));
            include(Vector2::new(x as f64, y1));
        }
        for y in bbox.min_y..=bbox.max_y {
            include(Vector2::new(x0, y as f64));
            include(Vector2::new(x1, y as f64));
        }

        if !min.x.is_finite() || !max.x.is_finite() {
            return BBox2i::default();
        }

        BBox2i::from_corners(
            snap_floor(min.x),
            snap_floor(min.y),
            snap_ceil(max.x),
            snap_ceil(max.y),
        )
    }
}

fn snap_floor(v: f64) -> i32 {
    let r = v.round();
    if (v - r).abs() < SNAP_EPSILON {
        r as i32
    } else {
        v.floor() as i32
    }
}

fn snap_ceil(v: f64) -> i32 {
    let r = v.round();
    if (v - r).abs() < SNAP_EPSILON {
        r as i32
    } else {
        v.ceil() as i32
    }
}

/// Plate carrée georeference: longitude and latitude are affine in pixels.
///
/// `origin` is the lon/lat of pixel `(0, 0)`; `pixel_size` holds degrees per
/// pixel along x (east) and y (south), both positive.
#[derive(Debug, Clone, PartialEq)]
pub struct EquirectGeoReference {
    proj4: String,
    origin: Vector2,
    pixel_size: Vector2,
}

impl EquirectGeoReference {
    pub fn new(origin: Vector2, pixel_size: Vector2) -> Self {
        Self {
            proj4: LONGLAT_PROJ4.to_string(),
            origin,
            pixel_size,
        }
    }

    /// Georeference an image of `width`x`height` pixels spanning the given
    /// bounds (degrees).
    pub fn from_bounds(
        width: u32,
        height: u32,
        north: f64,
        south: f64,
        east: f64,
        west: f64,
    ) -> Self {
        Self::new(
            Vector2::new(west, north),
            Vector2::new(
                (east - west) / width as f64,
                (north - south) / height as f64,
            ),
        )
    }

    /// Georeference covering the whole globe at the given size.
    pub fn global(width: u32, height: u32) -> Self {
        Self::from_bounds(width, height, 90.0, -90.0, 180.0, -180.0)
    }

    /// Replace the proj4 description (e.g. to carry datum parameters).
    pub fn with_proj4(mut self, proj4: impl Into<String>) -> Self {
        self.proj4 = proj4.into();
        self
    }
}

impl GeoReference for EquirectGeoReference {
    fn proj4_str(&self) -> &str {
        &self.proj4
    }

    fn pixel_to_lonlat(&self, pixel: Vector2) -> Vector2 {
        Vector2::new(
            self.origin.x + pixel.x * self.pixel_size.x,
            self.origin.y - pixel.y * self.pixel_size.y,
        )
    }

    fn lonlat_to_pixel(&self, lonlat: Vector2) -> Vector2 {
        Vector2::new(
            (lonlat.x - self.origin.x) / self.pixel_size.x,
            (self.origin.y - lonlat.y) / self.pixel_size.y,
        )
    }
}

/// Transform composed of two georeferences through lon/lat.
pub struct GeoTransform<'a> {
    source: &'a dyn GeoReference,
    output: &'a dyn GeoReference,
}

impl<'a> GeoTransform<'a> {
    pub fn new(source: &'a dyn GeoReference, output: &'a dyn GeoReference) -> Self {
        Self { source, output }
    }
}

impl Transform for GeoTransform<'_> {
    fn forward(&self, pixel: Vector2) -> Vector2 {
        self.output
            .lonlat_to_pixel(self.source.pixel_to_lonlat(pixel))
    }

    fn reverse(&self, pixel: Vector2) -> Vector2 {
        self.source
            .lonlat_to_pixel(self.output.pixel_to_lonlat(pixel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shift(f64, f64);

    impl Transform for Shift {
        fn forward(&self, p: Vector2) -> Vector2 {
            Vector2::new(p.x + self.0, p.y + self.1)
        }
        fn reverse(&self, p: Vector2) -> Vector2 {
            Vector2::new(p.x - self.0, p.y - self.1)
        }
    }

    #[test]
    fn test_equirect_global_edges() {
        let g = EquirectGeoReference::global(720, 360);
        assert_eq!(g.lonlat_to_pixel(Vector2::new(-180.0, 0.0)).x, 0.0);
        assert_eq!(g.lonlat_to_pixel(Vector2::new(180.0, 0.0)).x, 720.0);
        assert_eq!(g.lonlat_to_pixel(Vector2::new(0.0, 90.0)).y, 0.0);
        assert_eq!(g.lonlat_to_pixel(Vector2::new(0.0, -90.0)).y, 360.0);
    }

    #[test]
    fn test_equirect_roundtrip() {
        let g = EquirectGeoReference::from_bounds(200, 100, 45.0, 20.0, -70.0, -120.0);
        let p = Vector2::new(37.5, 81.25);
        let back = g.lonlat_to_pixel(g.pixel_to_lonlat(p));
        assert!((back - p).norm() < 1e-9);
    }

    #[test]
    fn test_with_proj4() {
        let g =
            EquirectGeoReference::global(4, 2).with_proj4("+proj=longlat +datum=WGS84");
        assert_eq!(g.proj4_str(), "+proj=longlat +datum=WGS84");
        assert_eq!(
            EquirectGeoReference::global(4, 2).proj4_str(),
            LONGLAT_PROJ4
        );
    }

    #[test]
    fn test_geotransform_identity() {
        let g = EquirectGeoReference::new(Vector2::new(-180.0, 90.0), Vector2::new(0.5, 0.5));
        let tx = GeoTransform::new(&g, &g);
        let p = Vector2::new(13.0, 7.0);
        assert_eq!(tx.forward(p), p);
        assert_eq!(tx.reverse(p), p);
        assert_eq!(
            tx.forward_bbox(BBox2i::new(0, 0, 100, 50)),
            BBox2i::new(0, 0, 100, 50)
        );
    }

    #[test]
    fn test_geotransform_scales_into_output() {
        // Input covers lon [0, 10], lat [0, 10] at 0.1 deg/pixel.
        let input = EquirectGeoReference::from_bounds(100, 100, 10.0, 0.0, 10.0, 0.0);
        // Output is global at 1 deg/pixel.
        let output = EquirectGeoReference::global(360, 180);
        let tx = GeoTransform::new(&input, &output);

        let bbox = tx.forward_bbox(BBox2i::new(0, 0, 100, 100));
        assert_eq!(bbox, BBox2i::from_corners(180, 80, 190, 90));
    }

    #[test]
    fn test_forward_bbox_shift() {
        let bbox = Shift(980.0, 0.0).forward_bbox(BBox2i::new(0, 0, 100, 100));
        assert_eq!(bbox, BBox2i::from_corners(980, 0, 1080, 100));
    }

    #[test]
    fn test_forward_bbox_fractional_grows_outward() {
        let bbox = Shift(0.5, -0.25).forward_bbox(BBox2i::new(0, 0, 10, 10));
        assert_eq!(bbox, BBox2i::from_corners(0, -1, 11, 10));
    }

    #[test]
    fn test_forward_bbox_empty_input() {
        let bbox = Shift(3.0, 3.0).forward_bbox(BBox2i::new(0, 0, 0, 10));
        assert!(bbox.is_empty());
    }
}
