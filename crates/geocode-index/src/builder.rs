//! Snapshot construction pipeline.
//!
//! Ingestion is pipelined per source: a reader task pulls records from the
//! adapter stream into a bounded channel while normalization consumes, so
//! I/O wait does not stall normalization of already-read records. Builds
//! are coalesced: a refresh arriving while a build is in flight awaits that
//! build instead of starting another, which also serializes builds per
//! store.

use chrono::Utc;
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};

use geocode_core::error::{GeocodeError, Result};
use geocode_core::models::FeatureId;
use geocode_sources::GeometrySource;

use crate::normalize::{FeatureNormalizer, NormalizeOutcome};
use crate::snapshot::{BuildReport, IndexSnapshot, SnapshotStore, SourceReport};
use crate::spatial::SpatialIndex;
use crate::text::TextIndex;

const CHANNEL_CAPACITY: usize = 256;
const PROGRESS_EVERY: usize = 1000;

/// Current phase of a build, for progress reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Reading,
    Loading,
    Publishing,
}

/// Progress information emitted during a build
#[derive(Debug, Clone)]
pub struct IndexProgress {
    pub phase: BuildPhase,
    pub source: Option<String>,
    pub processed: usize,
    pub message: String,
}

/// Orchestrates source -> normalizer -> index construction into immutable
/// snapshots.
pub struct IndexBuilder {
    store: Arc<SnapshotStore>,
    abort_threshold: f64,
    text_fields: Option<Vec<String>>,
    next_generation: AtomicU64,
    inflight: Mutex<Option<watch::Receiver<Option<u64>>>>,
}

enum BuildRole {
    Leader(watch::Sender<Option<u64>>),
    Waiter(watch::Receiver<Option<u64>>),
}

impl IndexBuilder {
    pub fn new(
        store: Arc<SnapshotStore>,
        abort_threshold: f64,
        text_fields: Option<Vec<String>>,
    ) -> Self {
        Self {
            store,
            abort_threshold,
            text_fields,
            next_generation: AtomicU64::new(0),
            inflight: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Build and publish a snapshot from the given sources.
    pub async fn build_snapshot(
        &self,
        sources: &[Box<dyn GeometrySource>],
    ) -> Result<Arc<IndexSnapshot>> {
        self.build_with_progress(sources, |_| {}).await
    }

    /// Full rebuild from sources; never an incremental patch. A refresh
    /// arriving while a build is already running awaits that build's
    /// outcome instead of stacking another.
    pub async fn refresh(
        &self,
        sources: &[Box<dyn GeometrySource>],
    ) -> Result<Arc<IndexSnapshot>> {
        self.build_snapshot(sources).await
    }

    /// Build with a progress callback driving e.g. a CLI progress bar.
    /// Only the leader of a coalesced group reports progress.
    pub async fn build_with_progress<F>(
        &self,
        sources: &[Box<dyn GeometrySource>],
        mut progress: F,
    ) -> Result<Arc<IndexSnapshot>>
    where
        F: FnMut(IndexProgress) + Send,
    {
        let role = {
            let mut inflight = self.inflight.lock().unwrap();
            match inflight.as_ref() {
                Some(rx) => BuildRole::Waiter(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    *inflight = Some(rx);
                    BuildRole::Leader(tx)
                }
            }
        };

        match role {
            BuildRole::Waiter(mut rx) => {
                if rx.changed().await.is_err() {
                    return Err(GeocodeError::BuildFailed {
                        reason: "In-flight build was cancelled".to_string(),
                    });
                }
                let outcome = *rx.borrow();
                match outcome {
                    Some(_generation) => self.store.current().ok_or_else(|| {
                        GeocodeError::BuildFailed {
                            reason: "Coalesced build published no snapshot".to_string(),
                        }
                    }),
                    None => Err(GeocodeError::BuildFailed {
                        reason: "Coalesced build failed".to_string(),
                    }),
                }
            }
            BuildRole::Leader(tx) => {
                let result = self.run_build(sources, &mut progress).await;
                *self.inflight.lock().unwrap() = None;
                let _ = tx.send(result.as_ref().ok().map(|s| s.generation));
                result
            }
        }
    }

    async fn run_build(
        &self,
        sources: &[Box<dyn GeometrySource>],
        progress: &mut (dyn FnMut(IndexProgress) + Send),
    ) -> Result<Arc<IndexSnapshot>> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let started_at = Utc::now();
        let normalizer = FeatureNormalizer::new();

        let mut records = Vec::new();
        let mut reports = Vec::new();

        for source in sources {
            let mut report = SourceReport { source_id: source.id().to_string(), ..Default::default() };
            progress(IndexProgress {
                phase: BuildPhase::Reading,
                source: Some(source.id().to_string()),
                processed: 0,
                message: format!("Reading source {}", source.id()),
            });

            match source.open().await {
                Err(e) => {
                    // Fatal to this source only; siblings continue.
                    tracing::error!(source = source.id(), error = %e, "source unavailable");
                    report.error = Some(e.to_string());
                }
                Ok(stream) => {
                    let checkpoint = records.len();
                    let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
                    tokio::spawn(async move {
                        let mut stream = stream;
                        while let Some(item) = stream.next().await {
                            if tx.send(item).await.is_err() {
                                break;
                            }
                        }
                    });

                    while let Some(item) = rx.recv().await {
                        report.read += 1;
                        match item {
                            Ok(raw) => {
                                let id = FeatureId(records.len() as u64);
                                match normalizer.normalize(source.id(), &raw, id) {
                                    NormalizeOutcome::Record(record) => {
                                        records.push(record);
                                        report.indexed += 1;
                                    }
                                    NormalizeOutcome::Skipped { .. } => report.skipped += 1,
                                }
                            }
                            Err(GeocodeError::MalformedRecord { key, reason, .. }) => {
                                tracing::warn!(
                                    source = source.id(),
                                    %key,
                                    %reason,
                                    "malformed record"
                                );
                                report.skipped += 1;
                            }
                            Err(other) => {
                                // A mid-stream failure beyond single records
                                // voids this source's partial data.
                                tracing::error!(
                                    source = source.id(),
                                    error = %other,
                                    "source failed mid-read"
                                );
                                records.truncate(checkpoint);
                                report.indexed = 0;
                                report.error = Some(other.to_string());
                                break;
                            }
                        }

                        if report.read % PROGRESS_EVERY == 0 {
                            progress(IndexProgress {
                                phase: BuildPhase::Reading,
                                source: Some(source.id().to_string()),
                                processed: report.read,
                                message: format!("Processed {} records", report.read),
                            });
                        }
                    }

                    if report.error.is_none()
                        && report.skipped > 0
                        && report.skipped as f64 / report.read as f64 > self.abort_threshold
                    {
                        return Err(GeocodeError::IngestionAborted {
                            source: source.id().to_string(),
                            failed: report.skipped,
                            read: report.read,
                        });
                    }
                }
            }

            tracing::info!(
                source = source.id(),
                read = report.read,
                indexed = report.indexed,
                skipped = report.skipped,
                "source ingested"
            );
            reports.push(report);
        }

        if records.is_empty() {
            return Err(GeocodeError::BuildFailed {
                reason: "No records survived normalization".to_string(),
            });
        }

        progress(IndexProgress {
            phase: BuildPhase::Loading,
            source: None,
            processed: records.len(),
            message: format!("Bulk-loading indexes over {} records", records.len()),
        });

        let spatial = SpatialIndex::build(&records);
        let text = TextIndex::build(&records, self.text_fields.as_deref());
        let report =
            BuildReport { sources: reports, started_at, finished_at: Utc::now() };

        let snapshot =
            Arc::new(IndexSnapshot::new(generation, records, spatial, text, report));

        progress(IndexProgress {
            phase: BuildPhase::Publishing,
            source: None,
            processed: snapshot.len(),
            message: format!("Publishing generation {}", generation),
        });

        if self.store.publish(snapshot.clone()) {
            tracing::info!(generation, records = snapshot.len(), "snapshot published");
        } else {
            tracing::info!(generation, "snapshot superseded before publication, discarded");
        }

        Ok(snapshot)
    }
}
