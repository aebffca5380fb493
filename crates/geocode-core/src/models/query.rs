//! Query requests and ranked results.

use crate::models::bbox::BoundingBox;
use crate::models::feature::FeatureId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Caller-supplied location used to weight results by proximity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bias {
    pub lat: f64,
    pub lon: f64,
    pub radius_m: f64,
}

/// An ephemeral geocode query. Created per call, no persisted identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Free-form query text; may be empty when a bias or box is given
    pub text: String,
    /// Optional proximity bias
    pub bias: Option<Bias>,
    /// Optional bounding box restriction
    pub bbox: Option<BoundingBox>,
    /// Result limit; None falls back to the configured default
    pub limit: Option<usize>,
    /// Equality filters over normalized attributes
    pub filters: BTreeMap<String, String>,
}

impl QueryRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Default::default() }
    }

    pub fn with_bias(mut self, lat: f64, lon: f64, radius_m: f64) -> Self {
        self.bias = Some(Bias { lat, lon, radius_m });
        self
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }
}

/// One ranked match. Produced fresh per query, never cached across
/// snapshots; record data is resolved against the snapshot the query ran on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub id: FeatureId,
    pub text_score: f64,
    pub spatial_score: f64,
    pub combined_score: f64,
    /// Zero-based rank position within the response
    pub rank: usize,
}
