//! Axis-aligned bounding boxes.

use crate::models::geometry::Geometry;
use serde::{Deserialize, Serialize};

/// Smallest axis-aligned rectangle enclosing a geometry, `[lon, lat]` axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Derive the bounding box from a geometry.
    ///
    /// Returns None for geometries without coordinates or with non-finite
    /// coordinates; such geometries never reach an index.
    pub fn from_geometry(geometry: &Geometry) -> Option<Self> {
        let coords = geometry.coords();
        if coords.is_empty() {
            return None;
        }

        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;

        for [x, y] in coords {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        if min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite() {
            Some(Self { min_x, min_y, max_x, max_y })
        } else {
            None
        }
    }

    /// Build a degree-space box around a point, padded by a metric radius.
    ///
    /// Longitude padding widens with latitude; at the poles the box spans
    /// all longitudes.
    pub fn around_point(lon: f64, lat: f64, radius_m: f64) -> Self {
        // One degree of latitude is ~111,320 m everywhere.
        let lat_pad = radius_m / 111_320.0;
        let cos_lat = lat.to_radians().cos().abs();
        let lon_pad = if cos_lat < 1e-9 { 180.0 } else { radius_m / (111_320.0 * cos_lat) };
        Self {
            min_x: lon - lon_pad,
            min_y: lat - lat_pad,
            max_x: lon + lon_pad,
            max_y: lat + lat_pad,
        }
    }

    /// True when the two boxes overlap in both axes
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_x && lon <= self.max_x && lat >= self.min_y && lat <= self.max_y
    }

    /// The point inside the box nearest to `(lon, lat)`; the point itself
    /// when it already lies inside.
    pub fn nearest_point(&self, lon: f64, lat: f64) -> [f64; 2] {
        [lon.clamp(self.min_x, self.max_x), lat.clamp(self.min_y, self.max_y)]
    }

    pub fn center(&self) -> [f64; 2] {
        [(self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_geometry_encloses_all_coords() {
        let geom = Geometry::line_string(vec![[-73.968, 40.785], [-74.0, 40.70]]);
        let bbox = BoundingBox::from_geometry(&geom).unwrap();

        for [x, y] in geom.coords() {
            assert!(bbox.contains_point(x, y));
        }
        assert_eq!(bbox.min_x, -74.0);
        assert_eq!(bbox.max_y, 40.785);
    }

    #[test]
    fn test_from_geometry_rejects_non_finite() {
        let geom = Geometry::point(f64::NAN, 0.0);
        assert!(BoundingBox::from_geometry(&geom).is_none());
    }

    #[test]
    fn test_intersects_edge_touching() {
        let a = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let b = BoundingBox::new(1.0, 1.0, 2.0, 2.0);
        let c = BoundingBox::new(1.1, 1.1, 2.0, 2.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_nearest_point_clamps() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(bbox.nearest_point(-5.0, 5.0), [0.0, 5.0]);
        assert_eq!(bbox.nearest_point(3.0, 4.0), [3.0, 4.0]);
    }

    #[test]
    fn test_around_point_widens_with_latitude() {
        let equator = BoundingBox::around_point(0.0, 0.0, 10_000.0);
        let arctic = BoundingBox::around_point(0.0, 70.0, 10_000.0);
        let eq_width = equator.max_x - equator.min_x;
        let arctic_width = arctic.max_x - arctic.min_x;
        assert!(arctic_width > eq_width);
        // Latitude padding is latitude-independent
        let eq_height = equator.max_y - equator.min_y;
        let arctic_height = arctic.max_y - arctic.min_y;
        assert!((eq_height - arctic_height).abs() < 1e-12);
    }
}
