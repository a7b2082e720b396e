//! Schema metadata table.
//!
//! A static mapping from entity name to field name to [`FieldMetadata`],
//! loaded once at process start. Field keys may be plain names, dotted
//! paths, or templated paths with `%s` wildcards; the reference-resolution
//! engine matches accumulated path templates against these keys.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::field::FieldMetadata;
use crate::error::Error;

/// Field table of one entity.
pub type EntityFields = BTreeMap<String, FieldMetadata>;

/// The schema metadata table: entity name → field key → metadata.
///
/// Immutable at runtime. An environment-specific JSON file with the same
/// shape fully replaces the built-in table when configured.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaMetadata {
    entities: BTreeMap<String, EntityFields>,
}

/// A pair of schema keys that can match the same value path.
///
/// Reported by [`SchemaMetadata::validate`] so operators fix the schema
/// instead of depending on resolution order.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaConflict {
    pub entity: String,
    pub literal: String,
    pub templated: String,
}

impl SchemaMetadata {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity with its field table.
    pub fn with_entity(mut self, name: impl Into<String>, fields: EntityFields) -> Self {
        self.entities.insert(name.into(), fields);
        self
    }

    /// Insert one field entry, creating the entity if needed.
    pub fn insert_field(
        &mut self,
        entity: impl Into<String>,
        key: impl Into<String>,
        meta: FieldMetadata,
    ) {
        self.entities
            .entry(entity.into())
            .or_default()
            .insert(key.into(), meta);
    }

    /// Load the table from its JSON form.
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load the table from a JSON file. The file replaces the built-in
    /// table wholesale; there is no merging.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidArgument(format!("cannot read schema file {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    /// Get the field table of an entity.
    pub fn entity(&self, name: &str) -> Option<&EntityFields> {
        self.entities.get(name)
    }

    /// Get one field entry by its exact key.
    pub fn field(&self, entity: &str, key: &str) -> Option<&FieldMetadata> {
        self.entities.get(entity).and_then(|fields| fields.get(key))
    }

    /// Entity names in the table.
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Report literal/templated key pairs that can match the same path.
    ///
    /// A templated key shadows a literal one when both have the same number
    /// of dotted segments and every templated segment is either `%s` or
    /// equal to the literal's segment.
    pub fn validate(&self) -> Vec<SchemaConflict> {
        let mut conflicts = Vec::new();
        for (entity, fields) in &self.entities {
            let templated: Vec<&String> =
                fields.keys().filter(|k| k.contains("%s")).collect();
            let literals: Vec<&String> =
                fields.keys().filter(|k| !k.contains("%s")).collect();
            for lit in &literals {
                let lit_segments: Vec<&str> = lit.split('.').collect();
                for tpl in &templated {
                    let tpl_segments: Vec<&str> = tpl.split('.').collect();
                    if lit_segments.len() != tpl_segments.len() {
                        continue;
                    }
                    let shadows = tpl_segments
                        .iter()
                        .zip(&lit_segments)
                        .all(|(t, l)| *t == "%s" || t == l);
                    if shadows {
                        conflicts.push(SchemaConflict {
                            entity: entity.clone(),
                            literal: (*lit).clone(),
                            templated: (*tpl).clone(),
                        });
                    }
                }
            }
        }
        conflicts
    }
}
