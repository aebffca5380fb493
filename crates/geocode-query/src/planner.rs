//! The per-request planner state machine.
//!
//! A request moves `Parsed -> SpatialFiltered -> TextFiltered -> Scored ->
//! Truncated -> Done`; the trace records the candidate count leaving each
//! stage. The configured deadline is checked between stages.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use geocode_core::config::EngineConfig;
use geocode_core::error::{GeocodeError, Result};
use geocode_core::geom::haversine_m;
use geocode_core::models::{BoundingBox, FeatureId, FeatureRecord, QueryRequest};
use geocode_index::IndexSnapshot;

use crate::models::{PlanStage, QueryOutcome, QueryTrace};
use crate::scorer::{CandidateScorer, ScoredCandidate};

/// Planner-facing slice of the engine configuration
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub w_text: f64,
    pub w_spatial: f64,
    pub max_bias_radius_m: f64,
    pub fuzzy_max_edits: u32,
    pub default_limit: usize,
    pub max_limit: usize,
    pub query_timeout: Duration,
}

impl PlannerConfig {
    pub fn from_engine(config: &EngineConfig) -> Self {
        Self {
            w_text: config.w_text.value,
            w_spatial: config.w_spatial.value,
            max_bias_radius_m: config.max_bias_radius_m.value,
            fuzzy_max_edits: config.fuzzy_max_edits.value,
            default_limit: config.default_limit.value,
            max_limit: config.max_limit.value,
            query_timeout: Duration::from_millis(config.query_timeout_ms.value),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self::from_engine(&EngineConfig::with_defaults())
    }
}

/// Plans and executes geocode queries against one snapshot.
///
/// Stateless between requests: one planner serves any number of concurrent
/// callers, each pinning its own snapshot.
pub struct QueryPlanner {
    config: PlannerConfig,
    scorer: CandidateScorer,
}

impl QueryPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        let scorer = CandidateScorer::new(config.w_text, config.w_spatial);
        Self { config, scorer }
    }

    pub fn execute(
        &self,
        snapshot: &IndexSnapshot,
        request: &QueryRequest,
    ) -> Result<QueryOutcome> {
        let started = Instant::now();
        let mut trace = QueryTrace::default();

        // Parsed
        let limit = self.validate(request)?;
        trace.push(PlanStage::Parsed, 0);
        self.check_deadline(started)?;

        // SpatialFiltered: narrow by box and/or bias radius when present
        let spatial_candidates = self.spatial_narrowing(snapshot, request);
        trace.push(
            PlanStage::SpatialFiltered,
            spatial_candidates.as_ref().map(|c| c.len()).unwrap_or(snapshot.len()),
        );
        self.check_deadline(started)?;

        // TextFiltered: intersect text matches with the spatial set when
        // one exists; a bias-only query keeps the spatial set, unscored.
        let mut candidates: Vec<(FeatureId, f64)> = if request.text.trim().is_empty() {
            spatial_candidates
                .as_ref()
                .map(|ids| ids.iter().map(|id| (*id, 0.0)).collect())
                .unwrap_or_default()
        } else {
            let matches = snapshot.text.search(&request.text, self.config.fuzzy_max_edits);
            match &spatial_candidates {
                Some(ids) => {
                    let allowed: HashSet<FeatureId> = ids.iter().copied().collect();
                    matches.into_iter().filter(|(id, _)| allowed.contains(id)).collect()
                }
                None => matches,
            }
        };

        if !request.filters.is_empty() {
            candidates.retain(|(id, _)| {
                snapshot.record(*id).is_some_and(|record| filters_match(record, request))
            });
        }
        trace.push(PlanStage::TextFiltered, candidates.len());
        self.check_deadline(started)?;

        // Scored: fuse text and spatial components; bias-relative distance
        // excludes candidates beyond the effective radius.
        let scored = self.score_candidates(snapshot, request, candidates);
        trace.push(PlanStage::Scored, scored.len());
        self.check_deadline(started)?;

        // Truncated
        let results = self.scorer.rank(scored, limit);
        trace.push(PlanStage::Truncated, results.len());
        trace.push(PlanStage::Done, results.len());

        tracing::debug!(
            text = %request.text,
            results = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query resolved"
        );

        Ok(QueryOutcome { results, trace })
    }

    /// Reject malformed requests; resolve the effective limit.
    fn validate(&self, request: &QueryRequest) -> Result<usize> {
        if request.text.trim().is_empty() && request.bias.is_none() && request.bbox.is_none() {
            return Err(GeocodeError::InvalidQuery {
                reason: "Query text is empty and no bias or bounding box was given".to_string(),
            });
        }
        match request.limit {
            Some(0) => Err(GeocodeError::InvalidQuery {
                reason: "Result limit must be positive".to_string(),
            }),
            Some(n) => Ok(n.min(self.config.max_limit)),
            None => Ok(self.config.default_limit),
        }
    }

    /// Candidate ids restricted by bounding box and/or bias radius; None
    /// when the request carries no spatial hint.
    fn spatial_narrowing(
        &self,
        snapshot: &IndexSnapshot,
        request: &QueryRequest,
    ) -> Option<Vec<FeatureId>> {
        let from_bbox = request.bbox.as_ref().map(|bbox| snapshot.spatial.range_query(bbox));

        let from_bias = request.bias.map(|bias| {
            let radius = self.effective_radius(bias.radius_m);
            let search_box = BoundingBox::around_point(bias.lon, bias.lat, radius);
            snapshot.spatial.range_query(&search_box)
        });

        match (from_bbox, from_bias) {
            (Some(a), Some(b)) => {
                let b: HashSet<FeatureId> = b.into_iter().collect();
                Some(a.into_iter().filter(|id| b.contains(id)).collect())
            }
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }

    fn score_candidates(
        &self,
        snapshot: &IndexSnapshot,
        request: &QueryRequest,
        candidates: Vec<(FeatureId, f64)>,
    ) -> Vec<ScoredCandidate> {
        candidates
            .into_iter()
            .filter_map(|(id, text_score)| {
                let record = snapshot.record(id)?;
                let spatial_score = match request.bias {
                    Some(bias) => {
                        let radius = self.effective_radius(bias.radius_m);
                        let nearest = record.bbox.nearest_point(bias.lon, bias.lat);
                        let distance = haversine_m([bias.lon, bias.lat], nearest);
                        // Outside the radius: excluded rather than scored
                        CandidateScorer::spatial_score(distance, radius)?
                    }
                    None => 0.0,
                };
                Some(ScoredCandidate { id, text_score, spatial_score })
            })
            .collect()
    }

    fn effective_radius(&self, requested_m: f64) -> f64 {
        requested_m.min(self.config.max_bias_radius_m)
    }

    fn check_deadline(&self, started: Instant) -> Result<()> {
        let elapsed = started.elapsed();
        if elapsed > self.config.query_timeout {
            return Err(GeocodeError::QueryTimeout {
                elapsed_ms: elapsed.as_millis() as u64,
                budget_ms: self.config.query_timeout.as_millis() as u64,
            });
        }
        Ok(())
    }
}

/// Equality filters over normalized attributes, case-insensitive on values
fn filters_match(record: &FeatureRecord, request: &QueryRequest) -> bool {
    request.filters.iter().all(|(key, expected)| {
        record
            .attribute(&key.trim().to_lowercase())
            .map(|value| value.to_display().eq_ignore_ascii_case(expected))
            .unwrap_or(false)
    })
}
