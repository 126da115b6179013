//! Store connection setup

use anyhow::{Context, Result};
use incidencias_core::Config;
use incidencias_db::{IncidenceStore, MongoIncidenceStore};
use std::sync::Arc;
use std::time::Duration;

/// Connect to MongoDB; an unreachable store aborts startup.
pub async fn setup_database(config: &Config) -> Result<Arc<dyn IncidenceStore>> {
    let timeout = Duration::from_secs(config.db_timeout_seconds());
    tracing::info!(timeout_secs = timeout.as_secs(), "Connecting to MongoDB");

    let store = MongoIncidenceStore::connect(config.mongo_uri(), config.mongo_db_name(), timeout)
        .await
        .context("Failed to connect to MongoDB")?;
    tracing::info!(database = store.database_name(), "Store ready");

    Ok(Arc::new(store))
}
