//! Incidence submission handlers
//!
//! Both transport shapes funnel into [`submit`]: normalize, validate, insert,
//! then render `{ success, id, fecha }` with 201.

use crate::error::{HttpAppError, ValidatedJson, ValidatedQuery};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use incidencias_core::{normalize, validate, AppError, ReportQuery, Submission};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub success: bool,
    pub id: String,
    pub fecha: DateTime<Utc>,
}

/// POST /api/reportar
#[tracing::instrument(skip(state, submission))]
pub async fn report_incidence(
    State(state): State<Arc<AppState>>,
    ValidatedJson(submission): ValidatedJson<Submission>,
) -> Result<impl IntoResponse, HttpAppError> {
    log_photo(submission.foto.as_ref());
    submit(&state, submission).await
}

/// GET /api/reportarData
#[tracing::instrument(skip(state, query))]
pub async fn report_incidence_query(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<ReportQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let submission = Submission::from(query);
    log_photo(submission.foto.as_ref());
    submit(&state, submission).await
}

fn log_photo(foto: Option<&serde_json::Value>) {
    let length = foto.and_then(|v| v.as_str()).map(|s| s.chars().count());
    tracing::info!(
        foto_received = length.is_some_and(|len| len > 0),
        foto_length = length.unwrap_or(0),
        "Submission received"
    );
}

async fn submit(
    state: &AppState,
    submission: Submission,
) -> Result<(StatusCode, Json<ReportResponse>), HttpAppError> {
    let candidate = normalize(submission, &state.normalize_options);
    let incidence = validate(&candidate).map_err(AppError::from)?;

    let bellota = incidence.bellota;
    let kind = incidence.kind;

    // Tracked task: a client disconnect cannot cancel an issued write, and shutdown waits for it
    let store = state.store.clone();
    let inserted = state
        .tasks
        .spawn(async move { store.insert(&incidence).await })
        .await
        .map_err(|e| AppError::Internal(format!("Insert task failed: {}", e)))?
        .map_err(AppError::from)?;

    tracing::info!(
        id = %inserted.id,
        bellota,
        kind = %kind,
        backend = state.store.backend(),
        "Incidence stored"
    );

    Ok((
        StatusCode::CREATED,
        Json(ReportResponse {
            success: true,
            id: inserted.id,
            fecha: inserted.created_at,
        }),
    ))
}
