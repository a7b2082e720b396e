//! Result types for query execution.

use std::collections::BTreeMap;

use crate::value::Value;

/// One document from a query result page.
///
/// A plain field mapping decorated with the originating document id and its
/// full path. Owned by the page that fetched it; a re-query discards it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultDocument {
    /// Document id within its collection.
    pub id: String,
    /// Full `/`-joined path, collection path included.
    pub path: String,
    /// Field values.
    pub fields: BTreeMap<String, Value>,
}

impl ResultDocument {
    /// Create a document with no fields.
    pub fn new(id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Render as JSON with the id and path alongside the fields.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "path": self.path,
            "fields": Value::Map(self.fields.clone()).to_json(),
        })
    }
}

/// A snapshot of documents returned by one store fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    pub docs: Vec<ResultDocument>,
}

impl QuerySnapshot {
    /// Create a snapshot.
    pub fn new(docs: Vec<ResultDocument>) -> Self {
        Self { docs }
    }

    /// Number of documents in the snapshot.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Check if the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// Outcome of an aggregate-mode execution.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateOutcome {
    /// Number of matching documents.
    Count(u64),
    /// Arithmetic sum of numeric values over the listed fields.
    Sum { fields: Vec<String>, total: f64 },
    /// Sum divided by the number of contributing documents, 0 if none.
    Average { fields: Vec<String>, value: f64 },
}

impl AggregateOutcome {
    /// Render the outcome as the single synthetic row aggregate modes show.
    pub fn synthetic_row(&self) -> ResultDocument {
        match self {
            AggregateOutcome::Count(n) => {
                ResultDocument::new("aggregate", "").with_field("count", *n as i64)
            }
            AggregateOutcome::Sum { total, .. } => {
                ResultDocument::new("aggregate", "").with_field("sum", *total)
            }
            AggregateOutcome::Average { value, .. } => {
                ResultDocument::new("aggregate", "").with_field("average", *value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_fields() {
        let doc = ResultDocument::new("u1", "users/u1")
            .with_field("name", "ada")
            .with_field("age", 36i64);
        assert_eq!(doc.get("name").and_then(Value::as_str), Some("ada"));
        assert_eq!(doc.get("age").and_then(Value::as_i64), Some(36));
        assert!(doc.get("missing").is_none());
    }

    #[test]
    fn test_synthetic_rows() {
        let row = AggregateOutcome::Count(7).synthetic_row();
        assert_eq!(row.get("count").and_then(Value::as_i64), Some(7));

        let row = AggregateOutcome::Sum {
            fields: vec!["age".into()],
            total: 99.5,
        }
        .synthetic_row();
        assert_eq!(row.get("sum").and_then(Value::as_f64), Some(99.5));
    }
}
