//! Immutable index snapshots and their atomic publication point.

use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

use geocode_core::models::{FeatureId, FeatureRecord};

use crate::spatial::SpatialIndex;
use crate::text::TextIndex;

/// Per-source ingestion tally
#[derive(Debug, Clone, Default)]
pub struct SourceReport {
    pub source_id: String,
    /// Records pulled from the source, malformed ones included
    pub read: usize,
    /// Records that survived normalization
    pub indexed: usize,
    /// Malformed or normalizer-skipped records
    pub skipped: usize,
    /// Source-fatal error, when the source could not be (fully) read
    pub error: Option<String>,
}

/// Build-wide ingestion ledger
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub sources: Vec<SourceReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BuildReport {
    pub fn total_indexed(&self) -> usize {
        self.sources.iter().map(|s| s.indexed).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.sources.iter().map(|s| s.skipped).sum()
    }
}

/// One immutable index generation: a consistent set of records with both
/// indexes built over it. Replaced, never patched; dropped when the last
/// reader lets go of its `Arc`.
pub struct IndexSnapshot {
    pub generation: u64,
    pub built_at: DateTime<Utc>,
    records: Vec<FeatureRecord>,
    pub spatial: SpatialIndex,
    pub text: TextIndex,
    pub report: BuildReport,
}

impl IndexSnapshot {
    pub(crate) fn new(
        generation: u64,
        records: Vec<FeatureRecord>,
        spatial: SpatialIndex,
        text: TextIndex,
        report: BuildReport,
    ) -> Self {
        Self { generation, built_at: Utc::now(), records, spatial, text, report }
    }

    /// Record lookup; ids are dense positions within this snapshot
    pub fn record(&self, id: FeatureId) -> Option<&FeatureRecord> {
        self.records.get(id.0 as usize)
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Publication point for snapshots.
///
/// Readers pin the current snapshot with an `Arc` clone and keep using it
/// for the whole query even if a newer generation is published meanwhile.
/// The lock is held only for the clone or the swap, never across a query.
#[derive(Default)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<IndexSnapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the current snapshot
    pub fn current(&self) -> Option<Arc<IndexSnapshot>> {
        self.current.read().unwrap().clone()
    }

    pub fn generation(&self) -> Option<u64> {
        self.current.read().unwrap().as_ref().map(|s| s.generation)
    }

    /// Atomically publish a snapshot. Last writer wins by generation: a
    /// stale build finishing after its successor is discarded and `false`
    /// is returned.
    pub fn publish(&self, snapshot: Arc<IndexSnapshot>) -> bool {
        let mut current = self.current.write().unwrap();
        match current.as_ref() {
            Some(existing) if existing.generation >= snapshot.generation => false,
            _ => {
                *current = Some(snapshot);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn empty_snapshot(generation: u64) -> Arc<IndexSnapshot> {
        Arc::new(IndexSnapshot::new(
            generation,
            Vec::new(),
            SpatialIndex::build(&[]),
            TextIndex::build(&[], None),
            BuildReport { sources: Vec::new(), started_at: Utc::now(), finished_at: Utc::now() },
        ))
    }

    #[test]
    fn test_publish_and_pin() {
        let store = SnapshotStore::new();
        assert!(store.current().is_none());

        assert!(store.publish(empty_snapshot(1)));
        let pinned = store.current().unwrap();
        assert_eq!(pinned.generation, 1);

        // A pinned snapshot survives publication of a newer one
        assert!(store.publish(empty_snapshot(2)));
        assert_eq!(pinned.generation, 1);
        assert_eq!(store.current().unwrap().generation, 2);
    }

    #[test]
    fn test_stale_publish_discarded() {
        let store = SnapshotStore::new();
        assert!(store.publish(empty_snapshot(5)));
        assert!(!store.publish(empty_snapshot(3)));
        assert_eq!(store.generation(), Some(5));
    }
}
