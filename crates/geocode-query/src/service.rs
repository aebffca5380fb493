//! Snapshot-pinning query entry point.

use std::sync::Arc;

use geocode_core::error::{GeocodeError, Result};
use geocode_core::models::QueryRequest;
use geocode_index::{IndexSnapshot, SnapshotStore};

use crate::models::QueryOutcome;
use crate::planner::{PlannerConfig, QueryPlanner};

/// Resolves queries against the currently published snapshot.
///
/// Each call pins the snapshot for its whole duration, so a query started
/// before a refresh keeps seeing one consistent generation. Reads take no
/// locks beyond the instant of the pin; any number of callers may search
/// concurrently.
pub struct QueryService {
    store: Arc<SnapshotStore>,
    planner: QueryPlanner,
}

impl QueryService {
    pub fn new(store: Arc<SnapshotStore>, config: PlannerConfig) -> Self {
        Self { store, planner: QueryPlanner::new(config) }
    }

    /// Pin the current snapshot and resolve the request against it.
    pub fn search(&self, request: &QueryRequest) -> Result<QueryOutcome> {
        let snapshot = self.store.current().ok_or(GeocodeError::IndexNotBuilt)?;
        self.planner.execute(&snapshot, request)
    }

    /// Resolve against an explicitly pinned snapshot (batch callers pin
    /// once for many requests).
    pub fn search_on(
        &self,
        snapshot: &IndexSnapshot,
        request: &QueryRequest,
    ) -> Result<QueryOutcome> {
        self.planner.execute(snapshot, request)
    }

    /// Pin the current snapshot for repeated use
    pub fn snapshot(&self) -> Result<Arc<IndexSnapshot>> {
        self.store.current().ok_or(GeocodeError::IndexNotBuilt)
    }
}
