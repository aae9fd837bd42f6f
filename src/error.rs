//! Error types for Healthsync Flux

use thiserror::Error;

/// Errors that can occur at the boundary of the aggregation pipeline.
///
/// Aggregation itself never fails; these cover payload parsing, configuration
/// and encoding.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse export payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
