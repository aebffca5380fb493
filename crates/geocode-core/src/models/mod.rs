//! Canonical data model: geometry, bounding boxes, feature records, queries.

pub mod bbox;
pub mod feature;
pub mod geometry;
pub mod query;

pub use bbox::BoundingBox;
pub use feature::{AttrValue, FeatureId, FeatureRecord, RawRecord, SourceRef};
pub use geometry::{Geometry, GeometryType};
pub use query::{Bias, QueryRequest, RankedResult};

/// Canonical coordinate reference system: WGS 84 longitude/latitude.
pub const CANONICAL_EPSG: u32 = 4326;
