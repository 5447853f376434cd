//! Axum router wiring.
//!
//! Ops endpoints are served directly; every other path goes through the
//! access gate before reaching the protected handler.

use axum::{
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{any, get},
    Router,
};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    let gated = Router::new()
        .route("/", any(protected))
        .route("/*path", any(protected))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            transport::http::access_gate,
        ));

    Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/metrics", get(ops::metrics))
        .merge(gated)
        .with_state(state)
}

/// Stand-in for the upstream application.
async fn protected() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
