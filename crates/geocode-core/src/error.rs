//! Error types for Geocode Search

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeocodeError {
    // Ingestion errors
    #[error("Source unavailable: {locator}: {reason}")]
    SourceUnavailable { locator: String, reason: String },

    #[error("Malformed record {key} in source {source}: {reason}")]
    MalformedRecord {
        source: String,
        key: String,
        reason: String,
    },

    #[error("Ingestion aborted for source {source}: {failed} of {read} records failed")]
    IngestionAborted {
        source: String,
        failed: usize,
        read: usize,
    },

    #[error("Index build failed: {reason}")]
    BuildFailed { reason: String },

    #[error("Unsupported locator: {locator}")]
    UnsupportedLocator { locator: String },

    // Query errors
    #[error("Invalid query: {reason}")]
    InvalidQuery { reason: String },

    #[error("Query exceeded its deadline: {elapsed_ms}ms elapsed, budget {budget_ms}ms")]
    QueryTimeout { elapsed_ms: u64, budget_ms: u64 },

    #[error("Index not built. Run a build before querying")]
    IndexNotBuilt,

    // Geometry errors
    #[error("Invalid geometry for record {key}: {reason}")]
    InvalidGeometry { key: String, reason: String },

    #[error("Projection from EPSG:{from} to EPSG:{to} failed: {reason}")]
    Projection { from: u32, to: u32, reason: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Relational source errors
    #[error("Database error: {0}")]
    Database(String),
}

pub type Result<T> = std::result::Result<T, GeocodeError>;
