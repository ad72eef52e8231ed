//! Health check endpoint.

use axum::{Json, Router, extract::State, routing::get};

use crate::api::dto::{HealthResponse, HealthStatus};
use crate::state::AppState;

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Degraded when no job type is registered: every submission would fail.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let job_types: Vec<String> = state
        .registry
        .job_types()
        .into_iter()
        .map(str::to_string)
        .collect();

    let status = if job_types.is_empty() {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    };

    Json(HealthResponse {
        status,
        version: state.application.version.clone(),
        timestamp: jiff::Timestamp::now().to_string(),
        job_types,
    })
}
