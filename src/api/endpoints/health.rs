//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub backend_reachable: bool,
    pub model: String,
    pub model_available: bool,
}

/// `GET /api/health`: service liveness plus a probe of the model backend.
///
/// The service itself is up whenever this answers; an unreachable backend is
/// reported in the body, not as an error status.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let pipeline = ctx.pipeline.clone();
    let backend = tokio::task::spawn_blocking(move || pipeline.check_backend()).await?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        backend_reachable: backend.reachable,
        model: backend.model,
        model_available: backend.model_available,
    }))
}
