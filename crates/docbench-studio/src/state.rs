//! Application state shared by the workbench.

use std::sync::Arc;

use docbench_core::{SavedQueryStore, SchemaMetadata};
use tempfile::TempDir;

use crate::config::StudioConfig;
use crate::demo;
use crate::error::Result;

/// Long-lived application state: the schema table selected at startup and
/// the saved-query database.
pub struct AppState {
    pub schema: Arc<SchemaMetadata>,
    pub saved: Arc<SavedQueryStore>,
    pub config: StudioConfig,
    _db: sled::Db,
    _temp_dir: Option<TempDir>,
}

impl AppState {
    /// Build the state from configuration.
    ///
    /// The schema override file, when configured, fully replaces the
    /// built-in table; the choice happens once here, never later.
    pub fn new(config: StudioConfig) -> Result<Self> {
        let (db, temp_dir) = match &config.data_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                (sled::open(dir)?, None)
            }
            None => {
                let temp = tempfile::tempdir()?;
                (sled::open(temp.path())?, Some(temp))
            }
        };
        let saved = SavedQueryStore::open(&db)?;

        let schema = match &config.schema_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading schema override");
                SchemaMetadata::from_file(path)?
            }
            None => demo::demo_schema(),
        };
        for conflict in schema.validate() {
            tracing::warn!(
                entity = %conflict.entity,
                literal = %conflict.literal,
                templated = %conflict.templated,
                "schema keys can match the same path; the literal entry wins"
            );
        }

        Ok(Self {
            schema: Arc::new(schema),
            saved: Arc::new(saved),
            config,
            _db: db,
            _temp_dir: temp_dir,
        })
    }
}
