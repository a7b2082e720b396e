//! Field metadata definitions.

use serde::{Deserialize, Serialize};

/// Declared kind of a document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Timestamp,
    Array,
    Map,
    Null,
}

/// Static metadata for one field of an entity.
///
/// `collection_ref` is a `/`-joined path pattern whose segments may be
/// literal or the placeholder `%s`; when present, the field's value is an
/// identifier into that collection (or a collection of identifiers for
/// array/map kinds). `ref_field` switches the match from a direct document
/// id to a `where ref_field == value` lookup.
///
/// The serde names follow the consumed JSON format: `type`, `isNullable`,
/// `collectionRef`, `refField`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    /// Field kind.
    #[serde(rename = "type")]
    pub kind: FieldKind,
    /// Whether the field may be null.
    #[serde(rename = "isNullable", default, skip_serializing_if = "is_false")]
    pub is_nullable: bool,
    /// Target collection path pattern, if the field is a cross-reference.
    #[serde(
        rename = "collectionRef",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub collection_ref: Option<String>,
    /// Match field on the target collection, if not a document-id lookup.
    #[serde(rename = "refField", default, skip_serializing_if = "Option::is_none")]
    pub ref_field: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl FieldMetadata {
    /// Create metadata for a plain field.
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            is_nullable: false,
            collection_ref: None,
            ref_field: None,
        }
    }

    /// Mark the field nullable.
    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    /// Declare the field a cross-reference into the given collection path
    /// pattern.
    pub fn with_collection_ref(mut self, pattern: impl Into<String>) -> Self {
        self.collection_ref = Some(pattern.into());
        self
    }

    /// Match on this field of the target collection instead of document id.
    pub fn with_ref_field(mut self, field: impl Into<String>) -> Self {
        self.ref_field = Some(field.into());
        self
    }

    /// Whether this field declares a cross-reference.
    pub fn is_reference(&self) -> bool {
        self.collection_ref.is_some()
    }
}
