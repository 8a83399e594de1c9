//! Error types for Kausal

use thiserror::Error;

/// Kausal error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Structural violation of the assumption graph (cycle, self-loop, duplicate edge).
    /// The graph is left exactly as it was before the offending call.
    #[error("Graph error: {0}")]
    Graph(String),

    /// Confounders declared in the graph are not columns of the supplied data.
    #[error(
        "Identification error: confounders of '{treatment}' -> '{outcome}' declared in the graph \
         are missing from the data: {missing:?}"
    )]
    Identification {
        /// Treatment variable of the estimator that failed.
        treatment: String,
        /// Outcome variable of the estimator that failed.
        outcome: String,
        /// Every missing confounder, sorted.
        missing: Vec<String>,
    },

    /// Validation error (roles, data shape, configuration)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error (singular or rank-deficient design, non-convergence)
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
