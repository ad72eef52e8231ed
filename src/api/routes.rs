//! Router configuration for the API.

use axum::{Router, middleware};

use crate::api::handlers;
use crate::api::middleware::{logging_middleware, request_id_middleware, unit_of_work_middleware};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let routes = Router::new()
        .merge(handlers::health::health_routes())
        .merge(handlers::jobs::job_routes());

    with_middleware(routes, state)
}

/// Last added runs first: request id, then logging, then the unit of work.
fn with_middleware(routes: Router<AppState>, state: AppState) -> Router {
    routes
        .layer(middleware::from_fn_with_state(
            state.clone(),
            unit_of_work_middleware,
        ))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
