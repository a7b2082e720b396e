//! Embedded in-memory document store.
//!
//! A small, fully local [`DocumentStore`] used by tests, demos, and local
//! sessions. Collections are keyed by their `/`-joined path; a collection
//! group selects every collection whose last path segment matches. Filter
//! evaluation follows the store protocol's operator semantics, including
//! the reserved document-id field.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use docbench_proto::{
    FieldFilter, QueryScope, QuerySnapshot, ResultDocument, StructuredQuery, Value, WhereOperator,
    DOC_ID_FIELD,
};

use crate::error::Error;
use crate::store::DocumentStore;

type Fields = BTreeMap<String, Value>;

/// An in-memory hierarchy of collections.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, BTreeMap<String, Fields>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a document in the collection at `path`.
    pub fn insert(&self, path: impl Into<String>, id: impl Into<String>, fields: Fields) {
        self.collections
            .write()
            .entry(path.into())
            .or_default()
            .insert(id.into(), fields);
    }

    /// Insert a document from its JSON object form.
    ///
    /// Non-object JSON becomes a single `value` field so seeding never
    /// fails.
    pub fn insert_json(
        &self,
        path: impl Into<String>,
        id: impl Into<String>,
        json: serde_json::Value,
    ) {
        let fields = match Value::from_json(json) {
            Value::Map(entries) => entries,
            other => {
                let mut fields = BTreeMap::new();
                fields.insert("value".to_string(), other);
                fields
            }
        };
        self.insert(path, id, fields);
    }

    /// Number of documents across all collections.
    pub fn len(&self) -> usize {
        self.collections.read().values().map(BTreeMap::len).sum()
    }

    /// Check if the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn run_query(&self, query: &StructuredQuery) -> Result<QuerySnapshot, Error> {
        let collections = self.collections.read();

        let mut docs: Vec<ResultDocument> = Vec::new();
        for (path, collection) in collections.iter() {
            let in_scope = match &query.scope {
                QueryScope::Collection { path: wanted } => path == wanted,
                QueryScope::CollectionGroup { id } => last_segment(path) == Some(id.as_str()),
            };
            if !in_scope {
                continue;
            }
            for (id, fields) in collection {
                let doc = ResultDocument {
                    id: id.clone(),
                    path: format!("{}/{}", path, id),
                    fields: fields.clone(),
                };
                if query.filters.iter().all(|f| FilterEvaluator::matches(f, &doc)) {
                    docs.push(doc);
                }
            }
        }
        drop(collections);

        match &query.order_by {
            Some(spec) => docs.sort_by(|a, b| {
                let ord = compare_for_sort(a.get(&spec.field), b.get(&spec.field));
                let ord = match spec.direction {
                    docbench_proto::OrderDirection::Asc => ord,
                    docbench_proto::OrderDirection::Desc => ord.reverse(),
                };
                ord.then_with(|| a.path.cmp(&b.path))
            }),
            None => docs.sort_by(|a, b| a.path.cmp(&b.path)),
        }

        if let Some(cursor) = &query.start_after {
            match docs.iter().position(|d| d.path == cursor.doc().path) {
                Some(pos) => {
                    docs.drain(..=pos);
                }
                None => {
                    tracing::debug!(
                        cursor = %cursor.doc().path,
                        "cursor document not in result set; restarting from the top"
                    );
                }
            }
        }

        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }

        Ok(QuerySnapshot::new(docs))
    }
}

fn last_segment(path: &str) -> Option<&str> {
    path.rsplit('/').find(|s| !s.is_empty())
}

/// Evaluates compiled field filters against documents.
pub struct FilterEvaluator;

impl FilterEvaluator {
    /// Evaluate one filter against a document.
    pub fn matches(filter: &FieldFilter, doc: &ResultDocument) -> bool {
        let field_value = Self::field_value(doc, &filter.field);
        match filter.operator {
            WhereOperator::Eq => field_value
                .map(|v| Self::values_equal(&v, &filter.value))
                .unwrap_or(false),
            WhereOperator::Ne => field_value
                .map(|v| !Self::values_equal(&v, &filter.value))
                .unwrap_or(false),
            WhereOperator::Lt => Self::compare(field_value, &filter.value)
                .map(Ordering::is_lt)
                .unwrap_or(false),
            WhereOperator::Le => Self::compare(field_value, &filter.value)
                .map(Ordering::is_le)
                .unwrap_or(false),
            WhereOperator::Gt => Self::compare(field_value, &filter.value)
                .map(Ordering::is_gt)
                .unwrap_or(false),
            WhereOperator::Ge => Self::compare(field_value, &filter.value)
                .map(Ordering::is_ge)
                .unwrap_or(false),
            WhereOperator::ArrayContains => match field_value {
                Some(Value::Array(items)) => {
                    items.iter().any(|v| Self::values_equal(v, &filter.value))
                }
                _ => false,
            },
            WhereOperator::ArrayContainsAny => match (field_value, &filter.value) {
                (Some(Value::Array(items)), Value::Array(wanted)) => items
                    .iter()
                    .any(|v| wanted.iter().any(|w| Self::values_equal(v, w))),
                _ => false,
            },
            WhereOperator::In => match (&field_value, &filter.value) {
                (Some(v), Value::Array(wanted)) => {
                    wanted.iter().any(|w| Self::values_equal(v, w))
                }
                _ => false,
            },
            WhereOperator::NotIn => match (&field_value, &filter.value) {
                (Some(v), Value::Array(wanted)) => {
                    !wanted.iter().any(|w| Self::values_equal(v, w))
                }
                // A missing field is not in any set.
                (None, _) => true,
                _ => false,
            },
        }
    }

    /// Look up a (possibly dotted) field path; the reserved id field maps
    /// onto the document id.
    fn field_value(doc: &ResultDocument, field: &str) -> Option<Value> {
        if field == DOC_ID_FIELD {
            return Some(Value::String(doc.id.clone()));
        }
        let mut segments = field.split('.');
        let mut current = doc.get(segments.next()?)?.clone();
        for segment in segments {
            current = current.as_map()?.get(segment)?.clone();
        }
        Some(current)
    }

    /// Equality with numeric widening: `Int(3)` equals `Float(3.0)`.
    pub fn values_equal(a: &Value, b: &Value) -> bool {
        match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => a == b,
        }
    }

    fn compare(field_value: Option<Value>, operand: &Value) -> Option<Ordering> {
        compare_values(&field_value?, operand)
    }
}

/// Order two values of comparable types; `None` for mixed or unordered
/// types.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Timestamp(x), Value::Timestamp(y)) => Some(x.cmp(y)),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    }
}

/// Total order used for sorting result sets: missing before null before
/// typed values, mixed types by rank.
fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => {
            let rank = type_rank(x).cmp(&type_rank(y));
            if rank != Ordering::Equal {
                return rank;
            }
            compare_values(x, y).unwrap_or(Ordering::Equal)
        }
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Float(_) => 2,
        Value::Timestamp(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Map(_) => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbench_proto::OrderDirection;

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_json(
            "users",
            "u1",
            serde_json::json!({"name": "ada", "age": 36, "tags": ["admin", "eng"]}),
        );
        store.insert_json(
            "users",
            "u2",
            serde_json::json!({"name": "grace", "age": 45, "tags": ["eng"]}),
        );
        store.insert_json("users", "u3", serde_json::json!({"name": "linus", "age": 25}));
        store.insert_json("groups/g1/members", "m1", serde_json::json!({"role": "owner"}));
        store.insert_json("groups/g2/members", "m2", serde_json::json!({"role": "guest"}));
        store
    }

    fn collection(path: &str) -> StructuredQuery {
        StructuredQuery::new(QueryScope::Collection { path: path.into() })
    }

    #[tokio::test]
    async fn test_collection_scope() {
        let snapshot = store().run_query(&collection("users")).await.unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.docs[0].path, "users/u1");
    }

    #[tokio::test]
    async fn test_collection_group_scope() {
        let query =
            StructuredQuery::new(QueryScope::CollectionGroup { id: "members".into() });
        let snapshot = store().run_query(&query).await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.docs.iter().any(|d| d.path == "groups/g1/members/m1"));
        assert!(snapshot.docs.iter().any(|d| d.path == "groups/g2/members/m2"));
    }

    #[tokio::test]
    async fn test_comparison_filters() {
        let query = collection("users").with_filter(FieldFilter::new(
            "age",
            WhereOperator::Gt,
            Value::Int(30),
        ));
        let snapshot = store().run_query(&query).await.unwrap();
        assert_eq!(snapshot.len(), 2);

        let query = collection("users").with_filter(FieldFilter::new(
            "name",
            WhereOperator::Eq,
            Value::String("ada".into()),
        ));
        let snapshot = store().run_query(&query).await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.docs[0].id, "u1");
    }

    #[tokio::test]
    async fn test_array_operators() {
        let query = collection("users").with_filter(FieldFilter::new(
            "tags",
            WhereOperator::ArrayContains,
            Value::String("admin".into()),
        ));
        let snapshot = store().run_query(&query).await.unwrap();
        assert_eq!(snapshot.len(), 1);

        let query = collection("users").with_filter(FieldFilter::new(
            "tags",
            WhereOperator::ArrayContainsAny,
            Value::Array(vec![Value::String("admin".into()), Value::String("ops".into())]),
        ));
        let snapshot = store().run_query(&query).await.unwrap();
        assert_eq!(snapshot.len(), 1);

        let query = collection("users").with_filter(FieldFilter::new(
            "name",
            WhereOperator::In,
            Value::Array(vec![Value::String("ada".into()), Value::String("grace".into())]),
        ));
        let snapshot = store().run_query(&query).await.unwrap();
        assert_eq!(snapshot.len(), 2);

        let query = collection("users").with_filter(FieldFilter::new(
            "name",
            WhereOperator::NotIn,
            Value::Array(vec![Value::String("ada".into())]),
        ));
        let snapshot = store().run_query(&query).await.unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[tokio::test]
    async fn test_doc_id_filter() {
        let query = collection("users").with_filter(FieldFilter::new(
            DOC_ID_FIELD,
            WhereOperator::Eq,
            Value::String("u2".into()),
        ));
        let snapshot = store().run_query(&query).await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.docs[0].id, "u2");
    }

    #[tokio::test]
    async fn test_order_and_limit() {
        let query = collection("users")
            .with_order_by("age", OrderDirection::Desc)
            .with_limit(2);
        let snapshot = store().run_query(&query).await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.docs[0].id, "u2");
        assert_eq!(snapshot.docs[1].id, "u1");
    }

    #[tokio::test]
    async fn test_cursor_pagination() {
        let store = store();
        let query = collection("users").with_limit(2);
        let first = store.run_query(&query).await.unwrap();
        assert_eq!(first.len(), 2);

        let cursor = docbench_proto::Cursor::after(first.docs.last().unwrap().clone());
        let query = collection("users").with_limit(2).with_start_after(cursor);
        let second = store.run_query(&query).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second.docs[0].id, "u3");
    }

    #[tokio::test]
    async fn test_dotted_field_path() {
        let store = MemoryStore::new();
        store.insert_json(
            "orders",
            "o1",
            serde_json::json!({"customer": {"city": "paris"}}),
        );
        store.insert_json(
            "orders",
            "o2",
            serde_json::json!({"customer": {"city": "oslo"}}),
        );
        let query = collection("orders").with_filter(FieldFilter::new(
            "customer.city",
            WhereOperator::Eq,
            Value::String("oslo".into()),
        ));
        let snapshot = store.run_query(&query).await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.docs[0].id, "o2");
    }
}
