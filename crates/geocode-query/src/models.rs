//! Planner-side models: plan stages and the per-request trace.

use geocode_core::models::RankedResult;
use serde::{Deserialize, Serialize};

/// Stages a request moves through, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStage {
    Parsed,
    SpatialFiltered,
    TextFiltered,
    Scored,
    Truncated,
    Done,
}

/// One trace entry: the stage reached and the candidate count leaving it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: PlanStage,
    pub candidates: usize,
}

/// Execution trace of one request, for explanation output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryTrace {
    pub stages: Vec<StageRecord>,
}

impl QueryTrace {
    pub fn push(&mut self, stage: PlanStage, candidates: usize) {
        self.stages.push(StageRecord { stage, candidates });
    }

    pub fn reached(&self, stage: PlanStage) -> bool {
        self.stages.iter().any(|s| s.stage == stage)
    }
}

/// Result of one planned query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub results: Vec<RankedResult>,
    pub trace: QueryTrace,
}
