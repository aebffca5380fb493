//! In-memory source for tests and programmatic ingestion.

use async_trait::async_trait;
use std::collections::HashMap;

use geocode_core::error::{GeocodeError, Result};
use geocode_core::models::{RawRecord, CANONICAL_EPSG};

use crate::{GeometrySource, RecordStream, SourceKind};

#[derive(Debug, Clone)]
enum MemoryItem {
    Record(RawRecord),
    Malformed { key: String, reason: String },
}

/// A source backed by a fixed set of records.
///
/// Malformed entries reproduce per-record adapter failures, which makes
/// failure-rate behavior testable without broken fixture files.
pub struct MemorySource {
    id: String,
    items: Vec<MemoryItem>,
}

impl MemorySource {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), items: Vec::new() }
    }

    pub fn push_record(&mut self, record: RawRecord) {
        self.items.push(MemoryItem::Record(record));
    }

    pub fn push_malformed(&mut self, key: impl Into<String>, reason: impl Into<String>) {
        self.items.push(MemoryItem::Malformed { key: key.into(), reason: reason.into() });
    }

    /// Convenience: a named point record in the canonical CRS
    pub fn push_point(&mut self, key: impl Into<String>, lon: f64, lat: f64, name: &str) {
        let mut attributes = HashMap::new();
        attributes.insert("name".to_string(), serde_json::json!(name));
        self.push_record(RawRecord {
            key: key.into(),
            geometry: serde_json::json!({"type": "Point", "coordinates": [lon, lat]}),
            attributes,
            crs: CANONICAL_EPSG,
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl GeometrySource for MemorySource {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Memory
    }

    async fn open(&self) -> Result<RecordStream> {
        let source_id = self.id.clone();
        let items: Vec<Result<RawRecord>> = self
            .items
            .iter()
            .map(|item| match item {
                MemoryItem::Record(record) => Ok(record.clone()),
                MemoryItem::Malformed { key, reason } => Err(GeocodeError::MalformedRecord {
                    source: source_id.clone(),
                    key: key.clone(),
                    reason: reason.clone(),
                }),
            })
            .collect();

        Ok(Box::pin(futures::stream::iter(items)))
    }
}
