//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Any `AppError` (or a type
//! that converts into one) becomes an `HttpAppError` through `?` and is rendered here
//! into the `{ "success": false, ... }` envelope with the status its metadata names.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use incidencias_core::{AppError, ErrorMetadata, LogLevel};
use serde::{de::DeserializeOwned, Serialize};
use std::any::Any;

/// Failure envelope for malformed requests and internal errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Failure envelope for validation errors, one message per failed rule.
#[derive(Debug, Serialize)]
pub struct ValidationErrorResponse {
    pub success: bool,
    pub errors: Vec<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from incidencias-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

/// Body failures: syntax errors, wrong content type, or a body over the admission limit.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                "Invalid request body: expected Content-Type: application/json".to_string()
            }
            JsonRejection::BytesRejection(ref inner) => {
                format!("Invalid request body: {}", inner.body_text())
            }
            other => format!("Invalid request body: {}", other.body_text()),
        };
        HttpAppError(AppError::MalformedRequest(message))
    }
}

impl From<QueryRejection> for HttpAppError {
    fn from(rejection: QueryRejection) -> Self {
        HttpAppError(AppError::MalformedRequest(format!(
            "Invalid query string: {}",
            rejection.body_text()
        )))
    }
}

/// JSON body extractor that answers with our envelope (400) on any body rejection.
/// Use this instead of `Json<T>` so malformed bodies never reach the validator.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

/// Query-string counterpart of [`ValidatedJson`].
#[derive(Debug, Clone, Copy)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(inner) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedQuery(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Request rejected");
        }
        LogLevel::Warn => {
            tracing::warn!(
                error = %error,
                error_type = error_type,
                recoverable = error.is_recoverable(),
                "Request failed"
            );
        }
        LogLevel::Error => {
            tracing::error!(
                error = %error.detailed_message(),
                error_type = error_type,
                "Request failed"
            );
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        if let Some(field_errors) = app_error.field_errors() {
            let body = ValidationErrorResponse {
                success: false,
                errors: field_errors.iter().map(|e| e.message.clone()).collect(),
            };
            return (status, Json(body)).into_response();
        }

        // client_message never carries store or internal details
        (status, Json(ErrorResponse::new(app_error.client_message()))).into_response()
    }
}

/// Terminal sink for handler panics: log the payload, answer with a generic 500.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    tracing::error!(panic = %detail, "Handler panicked");

    HttpAppError(AppError::Internal(detail)).into_response()
}

/// Fallback for routes outside the route table.
pub async fn not_found() -> HttpAppError {
    HttpAppError(AppError::NotFound("Not found".to_string()))
}
