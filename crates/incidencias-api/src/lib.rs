//! Incidencias API Library
//!
//! HTTP handlers, middleware and application setup for the incidence
//! reporting service.

pub mod error;
mod handlers;
pub mod middleware;
pub mod setup;
pub mod state;
mod telemetry;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
