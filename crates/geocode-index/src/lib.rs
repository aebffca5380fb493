//! Index construction and lifecycle: normalization, the spatial and text
//! indexes, immutable snapshots, and the build pipeline.

pub mod builder;
pub mod normalize;
pub mod snapshot;
pub mod spatial;
pub mod text;

pub use builder::{BuildPhase, IndexBuilder, IndexProgress};
pub use normalize::{FeatureNormalizer, NormalizeOutcome};
pub use snapshot::{BuildReport, IndexSnapshot, SnapshotStore, SourceReport};
pub use spatial::SpatialIndex;
pub use text::TextIndex;
