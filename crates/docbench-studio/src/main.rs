use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docbench_client::MemoryStore;
use docbench_proto::{query_state_to_url_params, url_params_to_query_state};
use docbench_studio::{
    config::{Args, StudioConfig},
    demo,
    state::AppState,
    workbench::WorkbenchSession,
};

#[tokio::main]
async fn main() -> docbench_studio::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let log_filter = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("docbench={}", log_filter).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config: StudioConfig = args.into();
    let state = AppState::new(config)?;

    // Demo store: an embedded dataset so the workbench runs without an
    // external document store.
    let store = Arc::new(MemoryStore::new());
    demo::seed_demo_store(&store);

    let mut session = WorkbenchSession::new(state.schema.clone(), state.saved.clone(), store);

    // Pick the query to run: the CLI parameter wins, then the most recent
    // saved query, then the demo default.
    let query = match &state.config.query {
        Some(url) => url_params_to_query_state(url),
        None => match state.saved.get_latest()? {
            Some(saved) => saved,
            None => url_params_to_query_state("path=posts&limit=10"),
        },
    };
    session.set_state(query);

    let page = session.execute().await?;

    tracing::info!(
        docs = page.docs.len(),
        annotations = page.annotations.len(),
        has_more = page.has_more,
        "query executed"
    );

    for doc in &page.docs {
        println!("{}", serde_json::to_string_pretty(&doc.to_json())?);
    }
    for annotation in &page.annotations {
        let path: Vec<String> = annotation.path.iter().map(|s| s.to_string()).collect();
        println!(
            "# {} -> {} ({})",
            path.join("."),
            annotation.descriptor.target_path,
            annotation
                .descriptor
                .match_field
                .as_deref()
                .unwrap_or("document id"),
        );
    }

    println!("share: ?{}", query_state_to_url_params(session.state()));

    Ok(())
}
