//! Paginated query execution.
//!
//! The [`ExecutionController`] drives compiled queries against a
//! [`DocumentStore`]: it owns the cursor, the result accumulator, and the
//! fetch state machine (`idle → fetching → idle`, or `→ failed` with retry
//! only via a fresh execute). At most one fetch is in flight; a fetch-next
//! while fetching is ignored, and a superseding execute invalidates the
//! in-flight request through a monotonically increasing generation token
//! checked when the response lands — a slow first page can never overwrite
//! a faster later query.

use std::sync::Arc;

use parking_lot::Mutex;

use docbench_proto::{
    AggregateMode, AggregateOutcome, Cursor, QueryPlan, QueryState, ResultDocument, Value,
};

use crate::error::Error;
use crate::store::DocumentStore;

/// Fetch state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    /// Nothing in flight; execute and fetch-next are accepted.
    Idle,
    /// A request is in flight; new requests are ignored.
    Fetching,
    /// The last request failed; only a fresh execute recovers.
    Failed,
}

/// Result of an execute call.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecuteOutcome {
    /// First page of a list-mode run.
    Page(ResultPage),
    /// Single synthetic row of an aggregate-mode run.
    Aggregate(AggregateOutcome),
    /// A newer execute superseded this one; its response was discarded.
    Superseded,
}

/// Result of a fetch-next call.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The accumulated result set after appending the new page.
    Page(ResultPage),
    /// A fetch is already in flight; the request was ignored.
    InFlight,
    /// No further pages exist (or the run cannot continue).
    Exhausted,
    /// A newer execute superseded this fetch; its response was discarded.
    Superseded,
}

/// A snapshot of the accumulated result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage {
    pub docs: Vec<ResultDocument>,
    pub has_more: bool,
}

struct Run {
    plan: QueryPlan,
    docs: Vec<ResultDocument>,
    cursor: Option<Cursor>,
    has_more: bool,
}

struct Inner {
    generation: u64,
    phase: FetchPhase,
    run: Option<Run>,
}

/// Drives compiled queries against a store, one page at a time.
pub struct ExecutionController<S> {
    store: Arc<S>,
    inner: Mutex<Inner>,
}

impl<S: DocumentStore> ExecutionController<S> {
    /// Create a controller over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            inner: Mutex::new(Inner {
                generation: 0,
                phase: FetchPhase::Idle,
                run: None,
            }),
        }
    }

    /// Compile and execute a query state from the top.
    ///
    /// Discards the cursor and accumulator of any previous run. Compile
    /// errors surface synchronously, before any store call.
    pub async fn execute(&self, state: &QueryState) -> Result<ExecuteOutcome, Error> {
        let plan = docbench_core::compile(state)?;

        let generation = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.phase = FetchPhase::Fetching;
            inner.run = None;
            inner.generation
        };

        let response = self.store.run_query(&plan.query).await;

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            tracing::debug!(generation, "discarding stale execute response");
            return Ok(ExecuteOutcome::Superseded);
        }

        let snapshot = match response {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // First-page failure: nothing stale may survive.
                inner.phase = FetchPhase::Failed;
                inner.run = None;
                tracing::warn!(error = %e, "query execution failed");
                return Err(e);
            }
        };

        inner.phase = FetchPhase::Idle;
        if plan.mode.is_aggregate() {
            let outcome = compute_aggregate(&plan.mode, &snapshot.docs);
            inner.run = Some(Run {
                plan,
                docs: vec![outcome.synthetic_row()],
                cursor: None,
                // Aggregates are a single synthetic row; never paginate.
                has_more: false,
            });
            return Ok(ExecuteOutcome::Aggregate(outcome));
        }

        let page_size = plan.query.limit;
        let has_more = page_size.is_some_and(|n| snapshot.docs.len() == n);
        let cursor = snapshot.docs.last().cloned().map(Cursor::after);
        let page = ResultPage {
            docs: snapshot.docs.clone(),
            has_more,
        };
        inner.run = Some(Run {
            plan,
            docs: snapshot.docs,
            cursor,
            has_more,
        });
        Ok(ExecuteOutcome::Page(page))
    }

    /// Fetch the next page of the current run.
    ///
    /// Ignored while a fetch is in flight; exhausted once a short page has
    /// been seen or after a failure.
    pub async fn fetch_next(&self) -> Result<FetchOutcome, Error> {
        let (generation, query) = {
            let mut inner = self.inner.lock();
            match inner.phase {
                FetchPhase::Fetching => return Ok(FetchOutcome::InFlight),
                FetchPhase::Failed => return Ok(FetchOutcome::Exhausted),
                FetchPhase::Idle => {}
            }
            let run = match &inner.run {
                Some(run) if run.has_more => run,
                _ => return Ok(FetchOutcome::Exhausted),
            };
            let mut query = run.plan.query.clone();
            query.start_after = run.cursor.clone();
            inner.phase = FetchPhase::Fetching;
            (inner.generation, query)
        };

        let response = self.store.run_query(&query).await;

        let mut inner = self.inner.lock();
        if inner.generation != generation {
            tracing::debug!(generation, "discarding stale page response");
            return Ok(FetchOutcome::Superseded);
        }

        let snapshot = match response {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // Subsequent-page failure: keep the accumulated pages.
                inner.phase = FetchPhase::Failed;
                tracing::warn!(error = %e, "page fetch failed");
                return Err(e);
            }
        };

        inner.phase = FetchPhase::Idle;
        let run = match inner.run.as_mut() {
            Some(run) => run,
            None => return Ok(FetchOutcome::Superseded),
        };
        run.has_more = query
            .limit
            .is_some_and(|n| snapshot.docs.len() == n);
        if let Some(last) = snapshot.docs.last() {
            run.cursor = Some(Cursor::after(last.clone()));
        }
        run.docs.extend(snapshot.docs);
        Ok(FetchOutcome::Page(ResultPage {
            docs: run.docs.clone(),
            has_more: run.has_more,
        }))
    }

    /// Current fetch phase.
    pub fn phase(&self) -> FetchPhase {
        self.inner.lock().phase
    }

    /// Snapshot of the accumulated documents of the current run.
    pub fn results(&self) -> Vec<ResultDocument> {
        self.inner
            .lock()
            .run
            .as_ref()
            .map(|run| run.docs.clone())
            .unwrap_or_default()
    }

    /// Whether the current run has more pages.
    pub fn has_more(&self) -> bool {
        self.inner
            .lock()
            .run
            .as_ref()
            .map(|run| run.has_more)
            .unwrap_or(false)
    }

    /// The plan of the current run, if any.
    pub fn current_plan(&self) -> Option<QueryPlan> {
        self.inner.lock().run.as_ref().map(|run| run.plan.clone())
    }
}

/// Compute the synthetic aggregate over a fetched document set.
///
/// Sum and average are client-side arithmetic over numeric values;
/// non-numeric values contribute 0. The average divides by the number of
/// fetched documents, 0 if none.
fn compute_aggregate(mode: &AggregateMode, docs: &[ResultDocument]) -> AggregateOutcome {
    match mode {
        AggregateMode::Count => AggregateOutcome::Count(docs.len() as u64),
        AggregateMode::Sum(fields) => AggregateOutcome::Sum {
            fields: fields.clone(),
            total: numeric_total(fields, docs),
        },
        AggregateMode::Average(fields) => {
            let value = if docs.is_empty() {
                0.0
            } else {
                numeric_total(fields, docs) / docs.len() as f64
            };
            AggregateOutcome::Average {
                fields: fields.clone(),
                value,
            }
        }
        AggregateMode::List => AggregateOutcome::Count(docs.len() as u64),
    }
}

fn numeric_total(fields: &[String], docs: &[ResultDocument]) -> f64 {
    docs.iter()
        .map(|doc| {
            fields
                .iter()
                .filter_map(|field| doc.get(field).and_then(Value::as_f64))
                .sum::<f64>()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use docbench_proto::{QueryState, SourceScope};

    fn seeded(count: usize) -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        for i in 0..count {
            store.insert_json(
                "items",
                format!("doc{:03}", i),
                serde_json::json!({"n": i as i64, "price": 10.0}),
            );
        }
        Arc::new(store)
    }

    fn list_query(limit: &str) -> QueryState {
        QueryState::new()
            .with_source(SourceScope::Collection, "items")
            .with_limit(limit)
    }

    #[tokio::test]
    async fn test_invalid_path_fails_before_fetch() {
        let controller = ExecutionController::new(seeded(1));
        let err = controller.execute(&QueryState::new()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Compile(docbench_core::Error::InvalidArgument(_))
        ));
        assert_eq!(controller.phase(), FetchPhase::Idle);
    }

    #[tokio::test]
    async fn test_pagination_run() {
        // 2N+1 documents with page size N: full, full, short.
        let controller = ExecutionController::new(seeded(11));
        let outcome = controller.execute(&list_query("5")).await.unwrap();
        let page = match outcome {
            ExecuteOutcome::Page(page) => page,
            other => panic!("expected page, got {:?}", other),
        };
        assert_eq!(page.docs.len(), 5);
        assert!(page.has_more);

        let page = match controller.fetch_next().await.unwrap() {
            FetchOutcome::Page(page) => page,
            other => panic!("expected page, got {:?}", other),
        };
        assert_eq!(page.docs.len(), 10);
        assert!(page.has_more);

        let page = match controller.fetch_next().await.unwrap() {
            FetchOutcome::Page(page) => page,
            other => panic!("expected page, got {:?}", other),
        };
        assert_eq!(page.docs.len(), 11);
        assert!(!page.has_more);

        // No duplicates across pages.
        let mut ids: Vec<&str> = page.docs.iter().map(|d| d.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 11);

        // Once a short page is seen, the run is exhausted for good.
        assert!(matches!(
            controller.fetch_next().await.unwrap(),
            FetchOutcome::Exhausted
        ));
    }

    #[tokio::test]
    async fn test_exact_multiple_ends_with_empty_page() {
        // 10 documents with page size 5: the second page is full, so a
        // third (empty) fetch is needed to learn the run is done.
        let controller = ExecutionController::new(seeded(10));
        controller.execute(&list_query("5")).await.unwrap();
        controller.fetch_next().await.unwrap();
        assert!(controller.has_more());

        let page = match controller.fetch_next().await.unwrap() {
            FetchOutcome::Page(page) => page,
            other => panic!("expected page, got {:?}", other),
        };
        assert_eq!(page.docs.len(), 10);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_no_limit_disables_pagination() {
        let controller = ExecutionController::new(seeded(7));
        let query = QueryState::new().with_source(SourceScope::Collection, "items");
        let outcome = controller.execute(&query).await.unwrap();
        let page = match outcome {
            ExecuteOutcome::Page(page) => page,
            other => panic!("expected page, got {:?}", other),
        };
        assert_eq!(page.docs.len(), 7);
        assert!(!page.has_more);
        assert!(matches!(
            controller.fetch_next().await.unwrap(),
            FetchOutcome::Exhausted
        ));
    }

    #[tokio::test]
    async fn test_fresh_execute_resets_run() {
        let controller = ExecutionController::new(seeded(11));
        controller.execute(&list_query("5")).await.unwrap();
        controller.fetch_next().await.unwrap();
        assert_eq!(controller.results().len(), 10);

        // Re-running from the top discards the accumulator and cursor.
        controller.execute(&list_query("5")).await.unwrap();
        assert_eq!(controller.results().len(), 5);
    }

    #[tokio::test]
    async fn test_count_aggregate() {
        let controller = ExecutionController::new(seeded(4));
        let query = QueryState::new()
            .with_source(SourceScope::Collection, "items")
            .with_count()
            .with_sum(vec!["price".into()]);
        let outcome = controller.execute(&query).await.unwrap();
        // Count wins over sum, and aggregates never paginate.
        assert_eq!(outcome, ExecuteOutcome::Aggregate(AggregateOutcome::Count(4)));
        assert!(!controller.has_more());
        assert!(matches!(
            controller.fetch_next().await.unwrap(),
            FetchOutcome::Exhausted
        ));
    }

    #[tokio::test]
    async fn test_sum_and_average() {
        let controller = ExecutionController::new(seeded(4));
        let query = QueryState::new()
            .with_source(SourceScope::Collection, "items")
            .with_sum(vec!["price".into(), "n".into()]);
        let outcome = controller.execute(&query).await.unwrap();
        match outcome {
            ExecuteOutcome::Aggregate(AggregateOutcome::Sum { total, .. }) => {
                // 4 * 10.0 + (0 + 1 + 2 + 3)
                assert_eq!(total, 46.0);
            }
            other => panic!("expected sum, got {:?}", other),
        }

        let query = QueryState::new()
            .with_source(SourceScope::Collection, "items")
            .with_average(vec!["price".into()]);
        match controller.execute(&query).await.unwrap() {
            ExecuteOutcome::Aggregate(AggregateOutcome::Average { value, .. }) => {
                assert_eq!(value, 10.0);
            }
            other => panic!("expected average, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_average_of_empty_set_is_zero() {
        let controller = ExecutionController::new(Arc::new(MemoryStore::new()));
        let query = QueryState::new()
            .with_source(SourceScope::Collection, "items")
            .with_average(vec!["price".into()]);
        match controller.execute(&query).await.unwrap() {
            ExecuteOutcome::Aggregate(AggregateOutcome::Average { value, .. }) => {
                assert_eq!(value, 0.0);
            }
            other => panic!("expected average, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_numeric_values_contribute_zero() {
        let store = MemoryStore::new();
        store.insert_json("items", "a", serde_json::json!({"price": 5}));
        store.insert_json("items", "b", serde_json::json!({"price": "n/a"}));
        let controller = ExecutionController::new(Arc::new(store));
        let query = QueryState::new()
            .with_source(SourceScope::Collection, "items")
            .with_sum(vec!["price".into()]);
        match controller.execute(&query).await.unwrap() {
            ExecuteOutcome::Aggregate(AggregateOutcome::Sum { total, .. }) => {
                assert_eq!(total, 5.0);
            }
            other => panic!("expected sum, got {:?}", other),
        }
    }
}
