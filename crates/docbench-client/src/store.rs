//! The consumed document-store protocol.

use async_trait::async_trait;
use docbench_proto::{QuerySnapshot, StructuredQuery};

use crate::error::Error;

/// A hierarchical document store that can run structured queries.
///
/// One fetch executes the whole constraint list: scope binding, field
/// filters in order, ordering, the `start_after` cursor, and the limit. The
/// returned snapshot exposes each document's id, full path, and fields.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run a structured query and return the matching page of documents.
    async fn run_query(&self, query: &StructuredQuery) -> Result<QuerySnapshot, Error>;
}
