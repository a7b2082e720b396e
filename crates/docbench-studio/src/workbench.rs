//! The workbench session.
//!
//! Ties the loop together: the current query state feeds the controller,
//! results come back annotated with reference descriptors, and clicking a
//! reference builds a new query state. The session flushes the outgoing
//! state to the saved-query store on every execute and navigation, so no
//! in-progress edit is ever lost.

use std::sync::Arc;

use docbench_client::{
    DocumentStore, ExecuteOutcome, ExecutionController, FetchOutcome, ResultPage,
};
use docbench_core::{refs, ReferenceDescriptor, SavedQueryStore, SchemaMetadata};
use docbench_proto::{
    AggregateOutcome, QueryState, ResultDocument, SourceScope, WhereClause, WhereOperator,
    DOC_ID_FIELD,
};

use crate::error::Result;

/// One annotated page of results, ready to render.
#[derive(Debug, Clone)]
pub struct WorkbenchPage {
    pub docs: Vec<ResultDocument>,
    pub annotations: Vec<refs::Annotation>,
    pub aggregate: Option<AggregateOutcome>,
    pub has_more: bool,
}

/// A single user-facing query session.
pub struct WorkbenchSession<S> {
    schema: Arc<SchemaMetadata>,
    saved: Arc<SavedQueryStore>,
    controller: ExecutionController<S>,
    state: QueryState,
}

impl<S: DocumentStore> WorkbenchSession<S> {
    /// Create a session with an empty default query.
    pub fn new(schema: Arc<SchemaMetadata>, saved: Arc<SavedQueryStore>, store: Arc<S>) -> Self {
        Self {
            schema,
            saved,
            controller: ExecutionController::new(store),
            state: QueryState::new(),
        }
    }

    /// The current query state.
    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Replace the current query state with an edited copy.
    pub fn set_state(&mut self, state: QueryState) {
        self.state = state;
    }

    /// Execute the current query from the top.
    ///
    /// The state is persisted before the store is called, so it survives
    /// even if the fetch fails.
    pub async fn execute(&mut self) -> Result<WorkbenchPage> {
        self.state = self.state.clone().touched();
        self.saved.put(&self.state)?;

        let outcome = self.controller.execute(&self.state).await?;
        Ok(match outcome {
            ExecuteOutcome::Page(page) => self.annotated(page),
            ExecuteOutcome::Aggregate(outcome) => WorkbenchPage {
                docs: vec![outcome.synthetic_row()],
                annotations: vec![],
                aggregate: Some(outcome),
                has_more: false,
            },
            ExecuteOutcome::Superseded => WorkbenchPage {
                docs: self.controller.results(),
                annotations: vec![],
                aggregate: None,
                has_more: self.controller.has_more(),
            },
        })
    }

    /// Fetch the next page and return the annotated accumulated set.
    pub async fn fetch_next(&mut self) -> Result<WorkbenchPage> {
        let outcome = self.controller.fetch_next().await?;
        Ok(match outcome {
            FetchOutcome::Page(page) => self.annotated(page),
            _ => self.annotated(ResultPage {
                docs: self.controller.results(),
                has_more: self.controller.has_more(),
            }),
        })
    }

    /// Follow a resolved reference: flush the current state, switch to a
    /// fresh query against the target collection, and execute it.
    pub async fn navigate(&mut self, descriptor: &ReferenceDescriptor) -> Result<WorkbenchPage> {
        self.saved.put(&self.state)?;
        tracing::info!(
            target = %descriptor.target_path,
            match_field = descriptor.match_field.as_deref().unwrap_or(DOC_ID_FIELD),
            "navigating reference"
        );
        self.state = query_for_reference(descriptor);
        self.execute().await
    }

    fn annotated(&self, page: ResultPage) -> WorkbenchPage {
        let annotations = match self.state.source.entity() {
            Some(entity) => page
                .docs
                .iter()
                .flat_map(|doc| {
                    refs::annotate(&self.schema, entity, doc, &self.state.source.path)
                })
                .collect(),
            None => vec![],
        };
        WorkbenchPage {
            docs: page.docs,
            annotations,
            aggregate: None,
            has_more: page.has_more,
        }
    }
}

/// Build the query state a reference navigation lands on: an equality
/// lookup on the match field, or a document-id lookup when none is set.
pub fn query_for_reference(descriptor: &ReferenceDescriptor) -> QueryState {
    let clause = match &descriptor.match_field {
        Some(field) => WhereClause::new(
            field.clone(),
            WhereOperator::Eq,
            descriptor.match_value.clone(),
        ),
        None => WhereClause::new(
            DOC_ID_FIELD,
            WhereOperator::Eq,
            descriptor.match_value.clone(),
        ),
    };
    QueryState::new()
        .with_title(format!("{} lookup", descriptor.target_path))
        .with_source(SourceScope::Collection, descriptor.target_path.clone())
        .with_where_clause(clause)
}
