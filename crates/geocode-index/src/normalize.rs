//! Record normalization: raw adapter output to canonical feature records.

use std::collections::BTreeMap;

use geocode_core::geom::{repair_geometry, reproject_geometry};
use geocode_core::models::{
    AttrValue, BoundingBox, FeatureId, FeatureRecord, Geometry, RawRecord, SourceRef,
    CANONICAL_EPSG,
};

/// Outcome of normalizing one raw record
#[derive(Debug, Clone)]
pub enum NormalizeOutcome {
    Record(FeatureRecord),
    Skipped { key: String, reason: String },
}

/// Validates and canonicalizes raw records before indexing.
///
/// Normalizing the same raw record twice yields byte-identical output:
/// attribute handling runs in sorted key order and nothing here consults a
/// clock or randomness.
#[derive(Debug, Clone)]
pub struct FeatureNormalizer {
    target_epsg: u32,
}

impl FeatureNormalizer {
    pub fn new() -> Self {
        Self { target_epsg: CANONICAL_EPSG }
    }

    /// Normalize one record, assigning it the given snapshot-dense id.
    pub fn normalize(&self, source_id: &str, raw: &RawRecord, id: FeatureId) -> NormalizeOutcome {
        let skip = |reason: String| {
            tracing::warn!(source = source_id, key = %raw.key, %reason, "skipping record");
            NormalizeOutcome::Skipped { key: raw.key.clone(), reason }
        };

        let Some(geometry) = Geometry::from_geojson(&raw.geometry) else {
            return skip("Unrecognized geometry".to_string());
        };

        let geometry = match reproject_geometry(&geometry, raw.crs, self.target_epsg) {
            Ok(g) => g,
            Err(e) => return skip(e.to_string()),
        };

        let geometry = match repair_geometry(&geometry, &raw.key) {
            Ok(g) => g,
            Err(e) => return skip(e.to_string()),
        };

        let Some(bbox) = BoundingBox::from_geometry(&geometry) else {
            return skip("Geometry has no bounding box".to_string());
        };

        NormalizeOutcome::Record(FeatureRecord {
            id,
            geometry,
            bbox,
            attributes: normalize_attributes(&raw.attributes),
            source_ref: SourceRef { source_id: source_id.to_string(), key: raw.key.clone() },
        })
    }
}

impl Default for FeatureNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lower-case and trim keys, keep scalar values only.
///
/// Keys are visited in sorted order so that colliding keys resolve the same
/// way on every run; the first key in sort order wins.
fn normalize_attributes(
    raw: &std::collections::HashMap<String, serde_json::Value>,
) -> BTreeMap<String, AttrValue> {
    let mut keys: Vec<&String> = raw.keys().collect();
    keys.sort();

    let mut attributes = BTreeMap::new();
    for key in keys {
        let normalized_key = key.trim().to_lowercase();
        if normalized_key.is_empty() {
            continue;
        }
        let value = match &raw[key] {
            serde_json::Value::String(s) => AttrValue::Text(s.clone()),
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => AttrValue::Number(f),
                None => continue,
            },
            serde_json::Value::Bool(b) => AttrValue::Bool(*b),
            // Null and structured values carry no searchable content
            _ => continue,
        };
        attributes.entry(normalized_key).or_insert(value);
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn raw_point(key: &str, lon: f64, lat: f64) -> RawRecord {
        RawRecord {
            key: key.to_string(),
            geometry: serde_json::json!({"type": "Point", "coordinates": [lon, lat]}),
            attributes: HashMap::new(),
            crs: CANONICAL_EPSG,
        }
    }

    #[test]
    fn test_normalize_point() {
        let normalizer = FeatureNormalizer::new();
        let mut raw = raw_point("p1", -73.968, 40.785);
        raw.attributes.insert("  NAME ".to_string(), serde_json::json!("Central Park"));
        raw.attributes.insert("Acres".to_string(), serde_json::json!(843));
        raw.attributes.insert("notes".to_string(), serde_json::Value::Null);

        let outcome = normalizer.normalize("parks", &raw, FeatureId(0));
        let record = match outcome {
            NormalizeOutcome::Record(r) => r,
            NormalizeOutcome::Skipped { reason, .. } => panic!("skipped: {}", reason),
        };

        assert_eq!(record.id, FeatureId(0));
        assert_eq!(record.attribute("name").unwrap().as_text(), Some("Central Park"));
        assert_eq!(record.attribute("acres"), Some(&AttrValue::Number(843.0)));
        assert!(record.attribute("notes").is_none());
        assert_eq!(record.source_ref.source_id, "parks");
        assert!(record.bbox.contains_point(-73.968, 40.785));
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let normalizer = FeatureNormalizer::new();
        let mut raw = raw_point("p1", 1.0, 2.0);
        for key in ["zeta", "Alpha", "midway", "ALPHA "] {
            raw.attributes.insert(key.to_string(), serde_json::json!(key));
        }

        let first = normalizer.normalize("s", &raw, FeatureId(7));
        let second = normalizer.normalize("s", &raw, FeatureId(7));

        let (a, b) = match (first, second) {
            (NormalizeOutcome::Record(a), NormalizeOutcome::Record(b)) => (a, b),
            _ => panic!("expected records"),
        };
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap(),
            "repeat normalization must be byte-identical"
        );
        // "ALPHA " and "Alpha" collide on "alpha"; sorted order makes the
        // winner stable.
        assert_eq!(a.attribute("alpha").unwrap().as_text(), Some("ALPHA "));
    }

    #[test]
    fn test_unparseable_geometry_is_skipped() {
        let normalizer = FeatureNormalizer::new();
        let raw = RawRecord {
            key: "bad".to_string(),
            geometry: serde_json::json!({"type": "Cube", "coordinates": []}),
            attributes: HashMap::new(),
            crs: CANONICAL_EPSG,
        };
        assert!(matches!(
            normalizer.normalize("s", &raw, FeatureId(0)),
            NormalizeOutcome::Skipped { .. }
        ));
    }

    #[test]
    fn test_unrepairable_polygon_is_skipped_with_reason() {
        let normalizer = FeatureNormalizer::new();
        let raw = RawRecord {
            key: "bowtie".to_string(),
            geometry: serde_json::json!({
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [10.0, 10.0], [10.0, 0.0], [0.0, 10.0], [0.0, 0.0]]]
            }),
            attributes: HashMap::new(),
            crs: CANONICAL_EPSG,
        };
        match normalizer.normalize("s", &raw, FeatureId(0)) {
            NormalizeOutcome::Skipped { key, reason } => {
                assert_eq!(key, "bowtie");
                assert!(reason.contains("self-intersecting"));
            }
            NormalizeOutcome::Record(_) => panic!("bowtie should not normalize"),
        }
    }

    #[test]
    fn test_open_ring_is_repaired_and_bbox_encloses() {
        let normalizer = FeatureNormalizer::new();
        let raw = RawRecord {
            key: "open".to_string(),
            geometry: serde_json::json!({
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]]]
            }),
            attributes: HashMap::new(),
            crs: CANONICAL_EPSG,
        };
        let record = match normalizer.normalize("s", &raw, FeatureId(0)) {
            NormalizeOutcome::Record(r) => r,
            NormalizeOutcome::Skipped { reason, .. } => panic!("skipped: {}", reason),
        };
        for [x, y] in record.geometry.coords() {
            assert!(record.bbox.contains_point(x, y));
        }
    }
}
