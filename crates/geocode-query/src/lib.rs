//! Query resolution: the planner state machine, candidate scoring, and the
//! snapshot-pinning query service.

pub mod models;
pub mod planner;
pub mod scorer;
pub mod service;

pub use models::{PlanStage, QueryOutcome, QueryTrace};
pub use planner::{PlannerConfig, QueryPlanner};
pub use scorer::CandidateScorer;
pub use service::QueryService;
