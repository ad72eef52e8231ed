//! Job submission handlers.

use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    http::StatusCode,
    routing::post,
};

use crate::api::dto::{SubmitJobRequest, SubmitJobResponse};
use crate::api::middleware::DeferredJobs;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn job_routes() -> Router<AppState> {
    Router::new().route("/jobs", post(submit_job))
}

/// Queue a job for the end of this request
///
/// The type is not resolved here: an unknown type is accepted and fails
/// during the drain, like any other job failure.
async fn submit_job(
    DeferredJobs(scheduler): DeferredJobs,
    payload: Result<Json<SubmitJobRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<SubmitJobResponse>)> {
    let Json(req) = payload?;

    let job_type = req.job_type.trim();
    if job_type.is_empty() {
        return Err(AppError::validation("type", "Job type must not be empty"));
    }

    let handle = scheduler.submit(job_type, req.args);
    Ok((StatusCode::ACCEPTED, Json(handle.snapshot().into())))
}
