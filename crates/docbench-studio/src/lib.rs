//! DocBench Studio: the interactive query workbench.
//!
//! Wires the core pieces into one application: configuration is parsed
//! once at startup (including the schema-override choice), the saved-query
//! database opens in sled, and a [`workbench::WorkbenchSession`] drives
//! execution, annotation, and reference navigation against a document
//! store.

pub mod config;
pub mod demo;
pub mod error;
pub mod state;
pub mod workbench;

pub use config::{Args, StudioConfig};
pub use error::{Result, StudioError};
pub use state::AppState;
pub use workbench::{query_for_reference, WorkbenchPage, WorkbenchSession};
