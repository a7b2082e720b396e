//! The user-editable query state model.
//!
//! A [`QueryState`] is the serializable description of one query: its source
//! (a collection path or a collection group), its constraints (where clauses,
//! ordering, limit), and its aggregation toggles. The struct round-trips
//! unchanged through persistence and URL encoding; where-clause values stay
//! the literal user-typed strings and are only parsed at compile time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scope of a query source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceScope {
    /// A single collection bound by its full path.
    #[serde(rename = "collection")]
    Collection,
    /// Every collection sharing the last path segment, at any nesting depth.
    #[serde(rename = "collection-group")]
    CollectionGroup,
}

/// Where a query reads from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySource {
    /// Collection or collection-group scope.
    pub scope: SourceScope,
    /// `/`-joined collection path as typed by the user.
    pub path: String,
}

impl QuerySource {
    /// The entity name this source queries: the last path segment.
    pub fn entity(&self) -> Option<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).next_back()
    }
}

impl Default for QuerySource {
    fn default() -> Self {
        Self {
            scope: SourceScope::Collection,
            path: String::new(),
        }
    }
}

/// Comparison operator of a where clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhereOperator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "array-contains")]
    ArrayContains,
    #[serde(rename = "array-contains-any")]
    ArrayContainsAny,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not-in")]
    NotIn,
}

impl WhereOperator {
    /// Stable textual form, identical to the URL encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            WhereOperator::Eq => "==",
            WhereOperator::Ne => "!=",
            WhereOperator::Lt => "<",
            WhereOperator::Le => "<=",
            WhereOperator::Gt => ">",
            WhereOperator::Ge => ">=",
            WhereOperator::ArrayContains => "array-contains",
            WhereOperator::ArrayContainsAny => "array-contains-any",
            WhereOperator::In => "in",
            WhereOperator::NotIn => "not-in",
        }
    }

    /// Parse the textual form back into an operator.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "==" => Some(WhereOperator::Eq),
            "!=" => Some(WhereOperator::Ne),
            "<" => Some(WhereOperator::Lt),
            "<=" => Some(WhereOperator::Le),
            ">" => Some(WhereOperator::Gt),
            ">=" => Some(WhereOperator::Ge),
            "array-contains" => Some(WhereOperator::ArrayContains),
            "array-contains-any" => Some(WhereOperator::ArrayContainsAny),
            "in" => Some(WhereOperator::In),
            "not-in" => Some(WhereOperator::NotIn),
            _ => None,
        }
    }

    /// Operators whose right-hand side must be an array.
    pub fn requires_array(&self) -> bool {
        matches!(
            self,
            WhereOperator::In | WhereOperator::NotIn | WhereOperator::ArrayContainsAny
        )
    }
}

/// Declared type of a where-clause value, governing compile-time coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhereValueType {
    String,
    Number,
    Boolean,
    Null,
    Timestamp,
}

impl WhereValueType {
    /// Stable textual form, identical to the URL encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            WhereValueType::String => "string",
            WhereValueType::Number => "number",
            WhereValueType::Boolean => "boolean",
            WhereValueType::Null => "null",
            WhereValueType::Timestamp => "timestamp",
        }
    }

    /// Parse the textual form back into a value type.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(WhereValueType::String),
            "number" => Some(WhereValueType::Number),
            "boolean" => Some(WhereValueType::Boolean),
            "null" => Some(WhereValueType::Null),
            "timestamp" => Some(WhereValueType::Timestamp),
            _ => None,
        }
    }
}

impl Default for WhereValueType {
    fn default() -> Self {
        WhereValueType::String
    }
}

/// One where clause as typed by the user.
///
/// `value` is always the literal user string; it is never replaced by a
/// parsed form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereClause {
    /// Field path the clause constrains.
    pub field: String,
    /// Comparison operator.
    pub operator: WhereOperator,
    /// Raw, unparsed value string.
    pub value: String,
    /// Declared value type used at compile time.
    #[serde(default)]
    pub value_type: WhereValueType,
}

impl WhereClause {
    /// Create a clause with the default string type.
    pub fn new(
        field: impl Into<String>,
        operator: WhereOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            value_type: WhereValueType::String,
        }
    }

    /// Set the declared value type.
    pub fn with_value_type(mut self, value_type: WhereValueType) -> Self {
        self.value_type = value_type;
        self
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    /// Stable textual form, identical to the URL encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "asc",
            OrderDirection::Desc => "desc",
        }
    }

    /// Parse the textual form back into a direction.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(OrderDirection::Asc),
            "desc" => Some(OrderDirection::Desc),
            _ => None,
        }
    }
}

impl Default for OrderDirection {
    fn default() -> Self {
        OrderDirection::Asc
    }
}

/// Ordering section of the constraints form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OrderByConfig {
    pub enabled: bool,
    pub field: String,
    #[serde(default)]
    pub direction: OrderDirection,
}

/// Limit section of the constraints form. `value` stays the raw user string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LimitConfig {
    pub enabled: bool,
    pub value: String,
}

/// All user constraints of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Constraints {
    #[serde(default)]
    pub where_clauses: Vec<WhereClause>,
    #[serde(default)]
    pub order_by: OrderByConfig,
    #[serde(default)]
    pub limit: LimitConfig,
}

/// Count toggle of the aggregation form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CountConfig {
    pub enabled: bool,
}

/// Field-list toggle of the aggregation form (sum and average).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FieldListConfig {
    pub enabled: bool,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Aggregation section of a query. Disabled sections carry no meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AggregationConfig {
    #[serde(default)]
    pub count: CountConfig,
    #[serde(default)]
    pub sum: FieldListConfig,
    #[serde(default)]
    pub average: FieldListConfig,
}

/// The serializable description of one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryState {
    /// Stable identifier, primary key in the saved-query store.
    pub id: String,
    /// User-facing title.
    pub title: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last-edit time; drives the "most recent" lookup.
    pub updated_at: DateTime<Utc>,
    /// Where the query reads from.
    pub source: QuerySource,
    /// Where/order/limit constraints.
    #[serde(default)]
    pub constraints: Constraints,
    /// Aggregation toggles.
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

impl QueryState {
    /// Create an empty default query with a fresh id.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: String::new(),
            created_at: now,
            updated_at: now,
            source: QuerySource::default(),
            constraints: Constraints::default(),
            aggregation: AggregationConfig::default(),
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the source path and scope.
    pub fn with_source(mut self, scope: SourceScope, path: impl Into<String>) -> Self {
        self.source = QuerySource {
            scope,
            path: path.into(),
        };
        self
    }

    /// Append a where clause.
    pub fn with_where_clause(mut self, clause: WhereClause) -> Self {
        self.constraints.where_clauses.push(clause);
        self
    }

    /// Enable ordering on a field.
    pub fn with_order_by(mut self, field: impl Into<String>, direction: OrderDirection) -> Self {
        self.constraints.order_by = OrderByConfig {
            enabled: true,
            field: field.into(),
            direction,
        };
        self
    }

    /// Enable a limit with the raw user string.
    pub fn with_limit(mut self, value: impl Into<String>) -> Self {
        self.constraints.limit = LimitConfig {
            enabled: true,
            value: value.into(),
        };
        self
    }

    /// Enable the count aggregation.
    pub fn with_count(mut self) -> Self {
        self.aggregation.count.enabled = true;
        self
    }

    /// Enable the sum aggregation over the given fields.
    pub fn with_sum(mut self, fields: Vec<String>) -> Self {
        self.aggregation.sum = FieldListConfig {
            enabled: true,
            fields,
        };
        self
    }

    /// Enable the average aggregation over the given fields.
    pub fn with_average(mut self, fields: Vec<String>) -> Self {
        self.aggregation.average = FieldListConfig {
            enabled: true,
            fields,
        };
        self
    }

    /// Return a copy with a bumped `updated_at`.
    ///
    /// Every edit path goes through copies; nothing mutates a stored state
    /// in place.
    pub fn touched(mut self) -> Self {
        self.updated_at = Utc::now();
        self
    }
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new()
    }
}
