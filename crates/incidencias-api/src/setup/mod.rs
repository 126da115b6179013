//! Application setup and initialization
//!
//! Startup order: validate configuration, initialize tracing, connect to the
//! store, build the router.

pub mod database;
pub mod routes;
pub mod server;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use incidencias_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.environment())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    validation::validate_config(&config).context("Configuration validation failed")?;
    tracing::info!(config = ?config, "Configuration loaded and validated");

    let store = database::setup_database(&config).await?;

    let state = Arc::new(AppState::new(config.clone(), store));
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
