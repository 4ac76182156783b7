//! HTTP route handlers for the resume gate.

use axum::{
    Router,
    http::{HeaderValue, header},
    routing::{get, post},
};
use gate_common::constants::headers::{CORS_ALLOW_HEADERS, CORS_ALLOW_METHODS};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod health;
mod resume;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // Validated at config load; fall back to the wildcard rather than panic
    let origin = HeaderValue::from_str(&state.config.allowed_origin)
        .unwrap_or_else(|_| HeaderValue::from_static("*"));

    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/metrics", get(health::metrics))

        // Resume access (the function is also reachable at the root)
        .route("/verify", post(resume::request_resume).options(resume::preflight))
        .route("/", post(resume::request_resume).options(resume::preflight))

        // CORS headers on every response, errors and preflights included
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            origin,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(CORS_ALLOW_HEADERS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        ))
        .layer(TraceLayer::new_for_http())

        // Add shared state
        .with_state(state)
}
