//! Canonical geometry representation.
//!
//! A GeoJSON-shaped coordinate-array enum that serializes as GeoJSON and
//! converts to/from `geo` crate types for computation. Coordinates are
//! always `[lon, lat]` in the canonical CRS once a record has passed
//! normalization.

use serde::{Deserialize, Serialize};

/// Geometry type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
}

/// GeoJSON-compatible geometry representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: [f64; 2],
    },
    LineString {
        coordinates: Vec<[f64; 2]>,
    },
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPoint {
        coordinates: Vec<[f64; 2]>,
    },
    MultiLineString {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
}

impl Geometry {
    /// Create a Point geometry
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point { coordinates: [x, y] }
    }

    /// Create a LineString geometry
    pub fn line_string(coords: Vec<[f64; 2]>) -> Self {
        Geometry::LineString { coordinates: coords }
    }

    /// Create a Polygon geometry
    pub fn polygon(rings: Vec<Vec<[f64; 2]>>) -> Self {
        Geometry::Polygon { coordinates: rings }
    }

    /// Get the geometry type
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point { .. } => GeometryType::Point,
            Geometry::LineString { .. } => GeometryType::LineString,
            Geometry::Polygon { .. } => GeometryType::Polygon,
            Geometry::MultiPoint { .. } => GeometryType::MultiPoint,
            Geometry::MultiLineString { .. } => GeometryType::MultiLineString,
            Geometry::MultiPolygon { .. } => GeometryType::MultiPolygon,
        }
    }

    /// Try to parse from a serde_json::Value (GeoJSON)
    pub fn from_geojson(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// Convert to serde_json::Value (GeoJSON)
    pub fn to_geojson(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Iterate every coordinate pair in the geometry
    pub fn coords(&self) -> Vec<[f64; 2]> {
        match self {
            Geometry::Point { coordinates } => vec![*coordinates],
            Geometry::LineString { coordinates } | Geometry::MultiPoint { coordinates } => {
                coordinates.clone()
            }
            Geometry::Polygon { coordinates } | Geometry::MultiLineString { coordinates } => {
                coordinates.iter().flatten().copied().collect()
            }
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().flat_map(|poly| poly.iter().flatten()).copied().collect()
            }
        }
    }

    /// Map every coordinate through `f`, preserving structure
    pub fn map_coords<F>(&self, mut f: F) -> crate::Result<Self>
    where
        F: FnMut([f64; 2]) -> crate::Result<[f64; 2]>,
    {
        let mapped = match self {
            Geometry::Point { coordinates } => Geometry::Point { coordinates: f(*coordinates)? },
            Geometry::LineString { coordinates } => Geometry::LineString {
                coordinates: coordinates.iter().map(|c| f(*c)).collect::<crate::Result<_>>()?,
            },
            Geometry::MultiPoint { coordinates } => Geometry::MultiPoint {
                coordinates: coordinates.iter().map(|c| f(*c)).collect::<crate::Result<_>>()?,
            },
            Geometry::Polygon { coordinates } => Geometry::Polygon {
                coordinates: coordinates
                    .iter()
                    .map(|ring| ring.iter().map(|c| f(*c)).collect::<crate::Result<_>>())
                    .collect::<crate::Result<_>>()?,
            },
            Geometry::MultiLineString { coordinates } => Geometry::MultiLineString {
                coordinates: coordinates
                    .iter()
                    .map(|line| line.iter().map(|c| f(*c)).collect::<crate::Result<_>>())
                    .collect::<crate::Result<_>>()?,
            },
            Geometry::MultiPolygon { coordinates } => Geometry::MultiPolygon {
                coordinates: coordinates
                    .iter()
                    .map(|poly| {
                        poly.iter()
                            .map(|ring| ring.iter().map(|c| f(*c)).collect::<crate::Result<_>>())
                            .collect::<crate::Result<_>>()
                    })
                    .collect::<crate::Result<_>>()?,
            },
        };
        Ok(mapped)
    }
}

/// Convert a canonical Geometry to a geo::Geometry
pub fn to_geo_geometry(geom: &Geometry) -> geo::Geometry {
    fn line(coords: &[[f64; 2]]) -> geo::LineString {
        geo::LineString::new(coords.iter().map(|c| geo::Coord { x: c[0], y: c[1] }).collect())
    }
    fn polygon(rings: &[Vec<[f64; 2]>]) -> geo::Polygon {
        match rings.split_first() {
            Some((exterior, interiors)) => {
                geo::Polygon::new(line(exterior), interiors.iter().map(|r| line(r)).collect())
            }
            None => geo::Polygon::new(geo::LineString::new(vec![]), vec![]),
        }
    }

    match geom {
        Geometry::Point { coordinates } => {
            geo::Geometry::Point(geo::Point::new(coordinates[0], coordinates[1]))
        }
        Geometry::LineString { coordinates } => geo::Geometry::LineString(line(coordinates)),
        Geometry::Polygon { coordinates } => geo::Geometry::Polygon(polygon(coordinates)),
        Geometry::MultiPoint { coordinates } => geo::Geometry::MultiPoint(geo::MultiPoint::new(
            coordinates.iter().map(|c| geo::Point::new(c[0], c[1])).collect(),
        )),
        Geometry::MultiLineString { coordinates } => geo::Geometry::MultiLineString(
            geo::MultiLineString::new(coordinates.iter().map(|l| line(l)).collect()),
        ),
        Geometry::MultiPolygon { coordinates } => geo::Geometry::MultiPolygon(
            geo::MultiPolygon::new(coordinates.iter().map(|p| polygon(p)).collect()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_serialization_round_trip() {
        let point = Geometry::point(-73.968, 40.785);
        let json = serde_json::to_string(&point).unwrap();
        assert!(json.contains("Point"));

        let parsed: Geometry = serde_json::from_str(&json).unwrap();
        assert_eq!(point, parsed);
    }

    #[test]
    fn test_from_geojson_value() {
        let value = serde_json::json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
        });
        let geom = Geometry::from_geojson(&value).unwrap();
        assert_eq!(geom.geometry_type(), GeometryType::Polygon);
    }

    #[test]
    fn test_from_geojson_rejects_garbage() {
        let value = serde_json::json!({"type": "Blob", "coordinates": []});
        assert!(Geometry::from_geojson(&value).is_none());
    }

    #[test]
    fn test_coords_flattens_multi_polygon() {
        let geom = Geometry::MultiPolygon {
            coordinates: vec![
                vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                vec![vec![[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]]],
            ],
        };
        assert_eq!(geom.coords().len(), 8);
    }

    #[test]
    fn test_map_coords_preserves_structure() {
        let geom = Geometry::line_string(vec![[1.0, 2.0], [3.0, 4.0]]);
        let shifted = geom.map_coords(|[x, y]| Ok([x + 1.0, y])).unwrap();
        assert_eq!(shifted, Geometry::line_string(vec![[2.0, 2.0], [4.0, 4.0]]));
    }

    #[test]
    fn test_to_geo_geometry_polygon() {
        let geom = Geometry::polygon(vec![
            vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]],
            vec![[2.0, 2.0], [4.0, 2.0], [4.0, 4.0], [2.0, 2.0]],
        ]);
        match to_geo_geometry(&geom) {
            geo::Geometry::Polygon(p) => {
                assert_eq!(p.exterior().0.len(), 5);
                assert_eq!(p.interiors().len(), 1);
            }
            other => panic!("expected polygon, got {:?}", other),
        }
    }
}
