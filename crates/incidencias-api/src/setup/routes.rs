//! Route configuration and setup

use crate::error::{handle_panic, not_found};
use crate::handlers::{report, root, status};
use crate::middleware::request_id_middleware;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use incidencias_core::Config;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the full router: route table, body admission limit and middleware stack.
pub fn setup_routes(
    config: &Config,
    state: Arc<AppState>,
) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    tracing::info!(
        max_body_size_bytes = config.max_body_size_bytes(),
        "Request body admission limit"
    );

    let app = Router::new()
        .route("/", get(root::greeting))
        .route("/api/reportar", post(report::report_incidence))
        .route("/api/reportarData", get(report::report_incidence_query))
        .route("/api/status", get(status::status))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(config.max_body_size_bytes()))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

/// Setup CORS configuration
fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    if config.cors_origins().iter().any(|o| o == "*") {
        if !config.is_production() {
            tracing::warn!("CORS configured to allow all origins - not recommended for production");
        }
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any));
    }

    let origins = config
        .cors_origins()
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(Any))
}
