//! Geometry validation and repair.
//!
//! Repair applies one simplification rule: drop consecutive duplicate
//! vertices and close open rings. Rings that remain self-intersecting after
//! repair are unrepairable; the caller drops the record.

use crate::error::{GeocodeError, Result};
use crate::models::geometry::Geometry;

/// Validation result with details
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validation error with location details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self { is_valid: true, errors: Vec::new() }
    }

    pub fn add_error(&mut self, location: impl Into<String>, reason: impl Into<String>) {
        self.is_valid = false;
        self.errors.push(ValidationError { location: location.into(), reason: reason.into() });
    }

    pub fn first_reason(&self) -> String {
        self.errors
            .first()
            .map(|e| format!("{}: {}", e.location, e.reason))
            .unwrap_or_else(|| "Invalid geometry".to_string())
    }
}

/// Validate a geometry without modifying it
pub fn validate_geometry(geometry: &Geometry) -> ValidationResult {
    let mut result = ValidationResult::valid();

    for (i, [x, y]) in geometry.coords().into_iter().enumerate() {
        if !x.is_finite() || !y.is_finite() {
            result.add_error(format!("coord[{}]", i), "Coordinates must be finite");
            // One non-finite coordinate is enough to sink the record
            return result;
        }
    }

    match geometry {
        Geometry::Point { .. } | Geometry::MultiPoint { .. } => {}
        Geometry::LineString { coordinates } => validate_line(coordinates, "LineString", &mut result),
        Geometry::MultiLineString { coordinates } => {
            for (i, line) in coordinates.iter().enumerate() {
                validate_line(line, &format!("MultiLineString[{}]", i), &mut result);
            }
        }
        Geometry::Polygon { coordinates } => validate_rings(coordinates, "Polygon", &mut result),
        Geometry::MultiPolygon { coordinates } => {
            for (i, poly) in coordinates.iter().enumerate() {
                validate_rings(poly, &format!("MultiPolygon[{}]", i), &mut result);
            }
        }
    }

    result
}

fn validate_line(line: &[[f64; 2]], location: &str, result: &mut ValidationResult) {
    if line.len() < 2 {
        result.add_error(location, format!("Needs at least 2 points, found {}", line.len()));
    }
}

fn validate_rings(rings: &[Vec<[f64; 2]>], location: &str, result: &mut ValidationResult) {
    if rings.is_empty() {
        result.add_error(location, "Polygon has no rings");
        return;
    }
    for (i, ring) in rings.iter().enumerate() {
        let loc = format!("{} ring[{}]", location, i);
        if ring.len() < 4 {
            result.add_error(&loc, format!("Ring needs at least 4 points, found {}", ring.len()));
            continue;
        }
        if ring.first() != ring.last() {
            result.add_error(&loc, "Ring is not closed");
        }
        if ring_self_intersects(ring) {
            result.add_error(&loc, "Ring is self-intersecting");
        }
    }
}

/// Repair a geometry, or fail when it cannot be made valid.
///
/// `key` is the native record key, used only for error reporting.
pub fn repair_geometry(geometry: &Geometry, key: &str) -> Result<Geometry> {
    let invalid = |reason: String| GeocodeError::InvalidGeometry { key: key.to_string(), reason };

    for [x, y] in geometry.coords() {
        if !x.is_finite() || !y.is_finite() {
            return Err(invalid("Coordinates must be finite".to_string()));
        }
    }

    let repaired = match geometry {
        Geometry::Point { .. } | Geometry::MultiPoint { .. } => geometry.clone(),
        Geometry::LineString { coordinates } => {
            Geometry::LineString { coordinates: repair_line(coordinates, key)? }
        }
        Geometry::MultiLineString { coordinates } => Geometry::MultiLineString {
            coordinates: coordinates.iter().map(|l| repair_line(l, key)).collect::<Result<_>>()?,
        },
        Geometry::Polygon { coordinates } => {
            Geometry::Polygon { coordinates: repair_rings(coordinates, key)? }
        }
        Geometry::MultiPolygon { coordinates } => Geometry::MultiPolygon {
            coordinates: coordinates.iter().map(|p| repair_rings(p, key)).collect::<Result<_>>()?,
        },
    };

    let check = validate_geometry(&repaired);
    if check.is_valid {
        Ok(repaired)
    } else {
        Err(invalid(check.first_reason()))
    }
}

fn repair_line(line: &[[f64; 2]], key: &str) -> Result<Vec<[f64; 2]>> {
    let deduped = dedup_consecutive(line);
    if deduped.len() < 2 {
        return Err(GeocodeError::InvalidGeometry {
            key: key.to_string(),
            reason: format!("Line collapses to {} point(s) after repair", deduped.len()),
        });
    }
    Ok(deduped)
}

fn repair_rings(rings: &[Vec<[f64; 2]>], key: &str) -> Result<Vec<Vec<[f64; 2]>>> {
    if rings.is_empty() {
        return Err(GeocodeError::InvalidGeometry {
            key: key.to_string(),
            reason: "Polygon has no rings".to_string(),
        });
    }
    rings
        .iter()
        .map(|ring| {
            let mut repaired = dedup_consecutive(ring);
            if let Some(first) = repaired.first().copied() {
                if repaired.last() != Some(&first) {
                    repaired.push(first);
                }
            }
            if repaired.len() < 4 {
                return Err(GeocodeError::InvalidGeometry {
                    key: key.to_string(),
                    reason: format!("Ring collapses to {} point(s) after repair", repaired.len()),
                });
            }
            if ring_self_intersects(&repaired) {
                return Err(GeocodeError::InvalidGeometry {
                    key: key.to_string(),
                    reason: "Ring remains self-intersecting after repair".to_string(),
                });
            }
            Ok(repaired)
        })
        .collect()
}

fn dedup_consecutive(coords: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let mut out: Vec<[f64; 2]> = Vec::with_capacity(coords.len());
    for &c in coords {
        if out.last() != Some(&c) {
            out.push(c);
        }
    }
    out
}

/// Proper-crossing scan over all non-adjacent segment pairs of a closed
/// ring. O(n²) in ring vertices, which is fine at typical ring sizes.
fn ring_self_intersects(ring: &[[f64; 2]]) -> bool {
    // A closed ring of n points has n-1 segments.
    let n = ring.len().saturating_sub(1);
    if n < 3 {
        return false;
    }
    for i in 0..n {
        for j in (i + 1)..n {
            // Adjacent segments share an endpoint; the first and last
            // segments of a closed ring are adjacent too.
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            if segments_cross(ring[i], ring[i + 1], ring[j], ring[j + 1]) {
                return true;
            }
        }
    }
    false
}

/// True when segments (a1,a2) and (b1,b2) properly cross
fn segments_cross(a1: [f64; 2], a2: [f64; 2], b1: [f64; 2], b2: [f64; 2]) -> bool {
    fn orient(p: [f64; 2], q: [f64; 2], r: [f64; 2]) -> f64 {
        (q[0] - p[0]) * (r[1] - p[1]) - (q[1] - p[1]) * (r[0] - p[0])
    }
    let d1 = orient(b1, b2, a1);
    let d2 = orient(b1, b2, a2);
    let d3 = orient(a1, a2, b1);
    let d4 = orient(a1, a2, b2);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<[f64; 2]> {
        vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]]
    }

    fn bowtie() -> Vec<[f64; 2]> {
        // Crosses itself in the middle
        vec![[0.0, 0.0], [10.0, 10.0], [10.0, 0.0], [0.0, 10.0], [0.0, 0.0]]
    }

    #[test]
    fn test_valid_polygon_passes() {
        let geom = Geometry::polygon(vec![square()]);
        assert!(validate_geometry(&geom).is_valid);
    }

    #[test]
    fn test_open_ring_fails_validation_and_repairs() {
        let mut open = square();
        open.pop();
        let geom = Geometry::polygon(vec![open]);
        assert!(!validate_geometry(&geom).is_valid);

        let repaired = repair_geometry(&geom, "r1").unwrap();
        assert!(validate_geometry(&repaired).is_valid);
    }

    #[test]
    fn test_duplicate_vertices_repaired() {
        let with_dupes = vec![
            [0.0, 0.0],
            [0.0, 0.0],
            [10.0, 0.0],
            [10.0, 10.0],
            [10.0, 10.0],
            [0.0, 10.0],
            [0.0, 0.0],
        ];
        let geom = Geometry::polygon(vec![with_dupes]);
        let repaired = repair_geometry(&geom, "r2").unwrap();
        match repaired {
            Geometry::Polygon { coordinates } => assert_eq!(coordinates[0].len(), 5),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_self_intersecting_ring_is_unrepairable() {
        let geom = Geometry::polygon(vec![bowtie()]);
        assert!(!validate_geometry(&geom).is_valid);
        let err = repair_geometry(&geom, "r3").unwrap_err();
        assert!(matches!(err, GeocodeError::InvalidGeometry { .. }));
    }

    #[test]
    fn test_degenerate_line_is_unrepairable() {
        let geom = Geometry::line_string(vec![[1.0, 1.0], [1.0, 1.0]]);
        assert!(repair_geometry(&geom, "r4").is_err());
    }

    #[test]
    fn test_non_finite_rejected() {
        let geom = Geometry::point(f64::INFINITY, 0.0);
        assert!(!validate_geometry(&geom).is_valid);
        assert!(repair_geometry(&geom, "r5").is_err());
    }
}
