//! Protocol error types.

use thiserror::Error;

/// Errors from the shared model layer.
#[derive(Debug, Error)]
pub enum Error {
    /// A URL parameter or clause segment could not be decoded.
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
}
