//! Router configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, stats};
use crate::state::AppState;

/// Create the service router.
///
/// # Routes
///
/// - `GET /health` - Liveness check
/// - `GET /v1/stats` - Aggregate usage statistics
///
/// The chat transport does not go through HTTP; this surface exists for
/// operators and deployment probes only.
pub fn create_router(state: AppState) -> Router {
    let request_timeout_seconds = state.config.request_timeout_seconds;
    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health::health))
        .route("/v1/stats", get(stats::stats))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}
