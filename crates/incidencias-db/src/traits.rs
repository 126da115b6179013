//! Store abstraction trait

use async_trait::async_trait;
use incidencias_core::{AppError, Incidence, InsertedIncidence};
use thiserror::Error;

/// Store operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transient failure: connection loss, election, timeout. Safe to retry.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the document (duplicate key, schema rejection).
    #[error("Document rejected: {0}")]
    Rejected(String),

    #[error("Store error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AppError::StoreUnavailable(msg),
            StoreError::Rejected(msg) => AppError::StoreRejected(msg),
            StoreError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Document store for incidence reports.
///
/// Implementations assign the identifier and both timestamps on insert
/// (`created_at == updated_at` for a fresh record) and never modify a record
/// once written.
#[async_trait]
pub trait IncidenceStore: Send + Sync {
    /// Persist a validated incidence and return its store-assigned identity.
    async fn insert(&self, incidence: &Incidence) -> StoreResult<InsertedIncidence>;

    /// Round-trip to the store; used by the health probe.
    async fn ping(&self) -> StoreResult<()>;

    /// Release connections. Called once on process shutdown.
    async fn shutdown(&self);

    /// Backend name for logs
    fn backend(&self) -> &'static str;
}
