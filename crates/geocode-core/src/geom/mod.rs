//! Geometry operations: CRS transformation, validation and repair, distance.

pub mod distance;
pub mod transform;
pub mod validation;

pub use distance::haversine_m;
pub use transform::reproject_geometry;
pub use validation::{repair_geometry, validate_geometry, ValidationError, ValidationResult};
