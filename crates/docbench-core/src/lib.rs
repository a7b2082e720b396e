//! DocBench core: schema catalog, query compiler, reference resolution, and
//! saved-query persistence.
//!
//! # Modules
//!
//! - [`catalog`] - Static schema metadata: field types and cross-reference
//!   descriptors per entity
//! - [`query`] - Compilation of a query state into the store query IR
//! - [`refs`] - The reference-resolution engine that turns values inside
//!   results into navigable cross-references
//! - [`saved`] - The sled-backed saved-query store
//! - [`error`] - Core error types

pub mod catalog;
pub mod error;
pub mod query;
pub mod refs;
pub mod saved;

pub use catalog::{FieldKind, FieldMetadata, SchemaMetadata};
pub use error::Error;
pub use query::compile;
pub use refs::{annotate, resolve, Annotation, LookupPosition, PathSegment, ReferenceDescriptor};
pub use saved::SavedQueryStore;
