//! Error types module
//!
//! All failures surfaced to clients are unified under [`AppError`]. Each variant
//! describes its own HTTP presentation through [`ErrorMetadata`]; only the HTTP
//! layer turns that metadata into a response.

use crate::validation::FieldError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like a store outage
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "VALIDATION_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether the client may retry the same request
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details must never reach the client
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Body unparseable, over the admission limit, or wrong content type.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Validation failed: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store rejected document: {0}")]
    StoreRejected(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<Vec<FieldError>> for AppError {
    fn from(errors: Vec<FieldError>) -> Self {
        AppError::Validation(errors)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, sensitive, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, bool, LogLevel) {
    match err {
        AppError::MalformedRequest(_) => (400, "MALFORMED_REQUEST", false, false, LogLevel::Debug),
        AppError::Validation(_) => (422, "VALIDATION_ERROR", false, false, LogLevel::Debug),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, false, LogLevel::Debug),
        AppError::StoreUnavailable(_) => (500, "STORE_UNAVAILABLE", true, true, LogLevel::Warn),
        AppError::StoreRejected(_) => (500, "STORE_REJECTED", false, true, LogLevel::Error),
        AppError::Internal(_) => (500, "INTERNAL_ERROR", false, true, LogLevel::Error),
        AppError::InternalWithSource { .. } => {
            (500, "INTERNAL_ERROR", false, true, LogLevel::Error)
        }
    }
}

impl AppError {
    /// Get the error type name for log records
    pub fn error_type(&self) -> &str {
        match self {
            AppError::MalformedRequest(_) => "MalformedRequest",
            AppError::Validation(_) => "Validation",
            AppError::NotFound(_) => "NotFound",
            AppError::StoreUnavailable(_) => "StoreUnavailable",
            AppError::StoreRejected(_) => "StoreRejected",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Field-level failures, when this is a validation error.
    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            AppError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = match self {
            AppError::InternalWithSource { message, .. } => format!("Internal error: {}", message),
            other => other.to_string(),
        };

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            AppError::MalformedRequest(ref msg) => msg.clone(),
            AppError::Validation(ref errors) => join_field_errors(errors),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::StoreUnavailable(_)
            | AppError::StoreRejected(_)
            | AppError::Internal(_)
            | AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
