//! Schema metadata catalog.
//!
//! Static, per-entity field metadata: types, nullability, and cross-reference
//! descriptors. Loaded once at startup, either from the built-in table or
//! from an environment-specific JSON file that replaces it entirely.

mod field;
mod schema;

pub use field::{FieldKind, FieldMetadata};
pub use schema::{EntityFields, SchemaConflict, SchemaMetadata};
