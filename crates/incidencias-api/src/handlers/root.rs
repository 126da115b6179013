use axum::response::IntoResponse;

/// GET /
pub async fn greeting() -> impl IntoResponse {
    "Servicio de reporte de incidencias en funcionamiento"
}
