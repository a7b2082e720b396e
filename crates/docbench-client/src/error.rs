//! Client error types.

use thiserror::Error;

/// Errors raised while executing queries.
#[derive(Debug, Error)]
pub enum Error {
    /// The query state failed to compile; no store call was made.
    #[error("compile error: {0}")]
    Compile(#[from] docbench_core::Error),

    /// The document-store call itself failed (network, permission, quota).
    #[error("upstream failure: {0}")]
    Upstream(String),
}
