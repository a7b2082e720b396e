//! DocBench shared model types.
//!
//! This crate defines the types every other DocBench crate speaks:
//!
//! - [`value`] - Runtime values for document fields and filter operands
//! - [`query`] - The user-editable, serializable query state model
//! - [`plan`] - The compiled query IR consumed by the document store
//! - [`result`] - Result documents, snapshots, and aggregate outcomes
//! - [`url`] - The URL query-parameter codec for shareable queries
//! - [`error`] - Model-layer error types
//!
//! Query states persist and travel as JSON (`serde`); the URL codec is the
//! only other produced encoding.

pub mod error;
pub mod plan;
pub mod query;
pub mod result;
pub mod url;
pub mod value;

pub use error::Error;

// Re-export commonly used types at crate root
pub use plan::{
    AggregateMode, Cursor, FieldFilter, OrderSpec, QueryPlan, QueryScope, StructuredQuery,
    DOC_ID_FIELD,
};
pub use query::{
    AggregationConfig, Constraints, CountConfig, FieldListConfig, LimitConfig, OrderByConfig,
    OrderDirection, QuerySource, QueryState, SourceScope, WhereClause, WhereOperator,
    WhereValueType,
};
pub use result::{AggregateOutcome, QuerySnapshot, ResultDocument};
pub use url::{query_state_to_url_params, url_params_to_query_state};
pub use value::Value;
