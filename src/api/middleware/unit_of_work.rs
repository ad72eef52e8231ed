//! One HTTP request is one unit of work
//!
//! Every request gets its own [`Scheduler`]. Handlers reach it through the
//! [`DeferredJobs`] extractor; once the handler has produced its response the
//! configured drain event fires on the blocking pool, so job execution never
//! holds up the client. The drain is tracked in [`AppState`] so graceful
//! shutdown waits for it.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use super::RequestId;
use crate::error::AppError;
use crate::jobs::{LifecycleHooks, NoopFlusher, Scheduler};
use crate::state::AppState;

#[derive(Clone)]
struct UnitOfWork {
    scheduler: Arc<Scheduler>,
}

/// Extractor for the current request's scheduler
pub struct DeferredJobs(pub Arc<Scheduler>);

impl<S> FromRequestParts<S> for DeferredJobs
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UnitOfWork>()
            .map(|unit| DeferredJobs(Arc::clone(&unit.scheduler)))
            .ok_or_else(|| AppError::Internal {
                source: anyhow::anyhow!("unit_of_work_middleware is not installed on this route"),
            })
    }
}

pub async fn unit_of_work_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let scheduler = Arc::new(state.scheduler());
    let hooks = Arc::new(LifecycleHooks::new());
    // The response is handed to hyper as soon as we return; nothing to flush.
    scheduler.install(&hooks, Arc::new(NoopFlusher));

    let request_id = RequestId::of(request.extensions())
        .map(RequestId::to_string)
        .unwrap_or_default();
    request.extensions_mut().insert(UnitOfWork {
        scheduler: Arc::clone(&scheduler),
    });

    let response = next.run(request).await;

    let pending = scheduler.pending_len();
    if pending > 0 {
        let event = state.queue.drain_event.clone();
        let span = tracing::info_span!("unit_of_work", request_id = %request_id, pending);
        state.spawn_drain(move || {
            span.in_scope(|| hooks.fire(&event));
        });
    }

    response
}
