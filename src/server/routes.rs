//! Application routing
//!
//! This module defines all HTTP routes for the application.

use axum::{middleware, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::api::{health, rate_limits};
use crate::middleware::{
    logging::log_request,
    rate_limit::{rate_limit, RateLimitState},
    REQUEST_ID_HEADER, TRACE_ID_HEADER,
};
use crate::middleware::rate_limit::{
    RATE_LIMIT_LIMIT_HEADER, RATE_LIMIT_REMAINING_HEADER, RATE_LIMIT_RESET_HEADER, RETRY_AFTER_HEADER,
};
use crate::server::state::AppState;
use crate::services::Quota;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // Health check routes (no authentication required)
    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness))
        .route("/liveness", get(health::liveness));

    // The reporter limits itself with the read quota before authenticating
    let read_limit = RateLimitState::new(
        state.rate_limiter.clone(),
        Quota::new(
            state.settings.rate_limit.read_limit,
            state.settings.rate_limit.read_window_ms,
        ),
        rate_limits::RATE_LIMITS_BUCKET,
        state.settings.rate_limit.enabled,
    );

    let reporting_routes = Router::new()
        .route("/rate-limits", get(rate_limits::get_rate_limits))
        .layer(middleware::from_fn_with_state(read_limit, rate_limit));

    Router::new()
        .merge(reporting_routes)
        .merge(health_routes)
        .layer(create_cors_layer())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Create CORS layer with permissive settings
fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            TRACE_ID_HEADER,
            REQUEST_ID_HEADER,
            RATE_LIMIT_LIMIT_HEADER,
            RATE_LIMIT_REMAINING_HEADER,
            RATE_LIMIT_RESET_HEADER,
            RETRY_AFTER_HEADER,
        ]
        .map(axum::http::HeaderName::from_static))
}
