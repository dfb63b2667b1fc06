//! Error types for analysis aggregation and model queries

use std::time::Duration;

use scaffold_model::ModelError;

/// A model query that produced no usable reply. Always recovered from: the
/// aggregator records it as a diagnostic and keeps the heuristic findings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelUnavailable {
    /// No reply within the per-query timeout
    #[error("model query timed out after {0:?}")]
    Timeout(Duration),

    /// Connection or protocol failure
    #[error("model transport failed: {0}")]
    Transport(String),

    /// Endpoint answered with a non-success status
    #[error("model endpoint returned status {0}")]
    Status(u16),

    /// Response body was not the expected envelope
    #[error("model response could not be decoded: {0}")]
    Decode(String),
}

/// Errors that stop aggregation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// A finding or surface entry does not resolve
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Run was cancelled
    #[error("analysis cancelled")]
    Cancelled,
}

/// Result alias for aggregation
pub type Result<T> = std::result::Result<T, AnalysisError>;
