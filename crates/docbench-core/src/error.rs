//! Core error types.

use thiserror::Error;

/// Core errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A query could not be compiled from the given state.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A reference template could not be resolved against the query path.
    #[error("unresolvable reference: {0}")]
    Unresolvable(String),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Saved query not found.
    #[error("query not found: {0}")]
    NotFound(String),
}
