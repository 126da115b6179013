//! Server startup and graceful shutdown

use crate::state::AppState;
use anyhow::Result;
use axum::Router;
use incidencias_core::Config;
use std::sync::Arc;

/// Serve until a termination signal, drain in-flight requests and store writes,
/// then close the store.
pub async fn start_server(config: &Config, app: Router, state: Arc<AppState>) -> Result<()> {
    let store = state.store.clone();
    let addr = format!("0.0.0.0:{}", config.server_port());
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        port = config.server_port(),
        environment = %config.environment(),
        backend = store.backend(),
        "Server ready and accepting connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    drain_store_writes(&state).await;
    store.shutdown().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Close the tracker and wait for every tracked insert to finish.
pub async fn drain_store_writes(state: &AppState) {
    state.tasks.close();
    let pending = state.tasks.len();
    if pending > 0 {
        tracing::info!(pending, "Waiting for in-flight store writes");
    }
    state.tasks.wait().await;
}

/// Signal handler for graceful shutdown
///
/// Listens for Ctrl+C (SIGINT) and SIGTERM. If a handler cannot be installed
/// that signal source is logged and ignored.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}
