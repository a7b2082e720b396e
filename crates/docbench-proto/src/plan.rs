//! Compiled query IR.
//!
//! The query compiler lowers a [`QueryState`](crate::query::QueryState) into
//! a [`QueryPlan`]: an ordered constraint list ([`StructuredQuery`]) plus the
//! execution mode selected from the aggregation toggles. The plan is what
//! the document-store protocol consumes.

use crate::query::{OrderDirection, WhereOperator};
use crate::result::ResultDocument;
use crate::value::Value;

/// Reserved field name that addresses a document's id in a filter.
///
/// References without a match field navigate by document id; the store maps
/// this sentinel onto the id instead of a document field.
pub const DOC_ID_FIELD: &str = "__name__";

/// What a structured query binds to.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryScope {
    /// A single collection addressed by its full `/`-joined path.
    Collection { path: String },
    /// All collections with this id, regardless of nesting depth.
    CollectionGroup { id: String },
}

impl QueryScope {
    /// The entity name queried by this scope: the collection id.
    pub fn entity(&self) -> &str {
        match self {
            QueryScope::Collection { path } => path
                .rsplit('/')
                .find(|s| !s.is_empty())
                .unwrap_or(path.as_str()),
            QueryScope::CollectionGroup { id } => id,
        }
    }
}

/// One compiled field constraint with a typed operand.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub operator: WhereOperator,
    pub value: Value,
}

impl FieldFilter {
    /// Create a filter.
    pub fn new(field: impl Into<String>, operator: WhereOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// Compiled ordering constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    pub field: String,
    pub direction: OrderDirection,
}

/// Opaque pagination token: the last document of the most recent page.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    doc: ResultDocument,
}

impl Cursor {
    /// Derive a cursor from the last document of a page.
    pub fn after(doc: ResultDocument) -> Self {
        Self { doc }
    }

    /// The document this cursor points past.
    pub fn doc(&self) -> &ResultDocument {
        &self.doc
    }
}

/// An ordered constraint list ready for the document store.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredQuery {
    pub scope: QueryScope,
    pub filters: Vec<FieldFilter>,
    pub order_by: Option<OrderSpec>,
    pub limit: Option<usize>,
    pub start_after: Option<Cursor>,
}

impl StructuredQuery {
    /// Create a query over the given scope with no constraints.
    pub fn new(scope: QueryScope) -> Self {
        Self {
            scope,
            filters: vec![],
            order_by: None,
            limit: None,
            start_after: None,
        }
    }

    /// Append a field filter.
    pub fn with_filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set the ordering constraint.
    pub fn with_order_by(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_by = Some(OrderSpec {
            field: field.into(),
            direction,
        });
        self
    }

    /// Set the page size.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the pagination cursor.
    pub fn with_start_after(mut self, cursor: Cursor) -> Self {
        self.start_after = Some(cursor);
        self
    }
}

/// Result-shaping strategy selected from the aggregation toggles.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateMode {
    /// Raw documents, annotated with reference descriptors.
    List,
    /// Single count row.
    Count,
    /// Single sum row over these fields.
    Sum(Vec<String>),
    /// Single average row over these fields.
    Average(Vec<String>),
}

impl AggregateMode {
    /// Whether this mode collapses results to a single synthetic row.
    pub fn is_aggregate(&self) -> bool {
        !matches!(self, AggregateMode::List)
    }
}

/// A compiled query: the constraint list plus the execution mode.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub query: StructuredQuery,
    pub mode: AggregateMode,
}
