//! Studio error types.

use thiserror::Error;

/// Errors surfaced by the workbench application.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("core error: {0}")]
    Core(#[from] docbench_core::Error),

    #[error("execution error: {0}")]
    Execution(#[from] docbench_client::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
}

/// Convenience result alias for studio operations.
pub type Result<T> = std::result::Result<T, StudioError>;
