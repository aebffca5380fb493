//! Feature records: the unit of ingestion and indexing.

use crate::models::bbox::BoundingBox;
use crate::models::geometry::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Unique identifier for a feature within one snapshot.
///
/// Ids are dense: a record's id equals its position in the snapshot's
/// record table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId(pub u64);

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalized attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render for display and filter comparison
    pub fn to_display(&self) -> String {
        match self {
            AttrValue::Text(s) => s.clone(),
            AttrValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            AttrValue::Bool(b) => b.to_string(),
        }
    }
}

/// Identifies the originating source and its native record key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_id: String,
    pub key: String,
}

/// A record as emitted by a source adapter, prior to normalization
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// Native record key within the source
    pub key: String,
    /// GeoJSON-shaped geometry value
    pub geometry: serde_json::Value,
    /// Raw attributes, untrimmed keys, arbitrary JSON values
    pub attributes: HashMap<String, serde_json::Value>,
    /// EPSG code of the source coordinates
    pub crs: u32,
}

/// One geographic entity, normalized and immutable.
///
/// Records belong to exactly one snapshot and are never mutated after
/// ingestion; an update produces a new record in a new snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub id: FeatureId,
    /// Canonical-CRS geometry
    pub geometry: Geometry,
    /// Always encloses `geometry`; recomputed by the normalizer whenever
    /// the geometry changes
    pub bbox: BoundingBox,
    /// Lower-cased, trimmed keys; deterministic iteration order
    pub attributes: BTreeMap<String, AttrValue>,
    pub source_ref: SourceRef,
}

impl FeatureRecord {
    /// Attribute lookup by already-normalized key
    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }
}
