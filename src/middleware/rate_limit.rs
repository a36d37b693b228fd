//! Rate limiting middleware
//!
//! Applies a sliding-window quota to a route, keyed by client IP and a
//! bucket name. Rejected requests get a ready-to-send 429 response.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::rate_limiter::{BucketStats, Quota, RateLimitError, SlidingWindowLimiter};
use crate::utils::client_ip;

/// Header names used on limited routes
pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";
pub const RETRY_AFTER_HEADER: &str = "retry-after";

/// Per-route rate limit state
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: SlidingWindowLimiter,
    pub quota: Quota,
    pub bucket: &'static str,
    pub enabled: bool,
}

impl RateLimitState {
    pub fn new(limiter: SlidingWindowLimiter, quota: Quota, bucket: &'static str, enabled: bool) -> Self {
        Self {
            limiter,
            quota,
            bucket,
            enabled,
        }
    }
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let retry_after = self.retry_after_seconds();
        let body = json!({
            "error": "Too Many Requests",
            "retry_after": retry_after,
        });

        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();

        let headers = response.headers_mut();
        headers.insert(RETRY_AFTER_HEADER, HeaderValue::from(retry_after));
        headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(self.limit));
        headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(0u32));
        headers.insert(RATE_LIMIT_RESET_HEADER, HeaderValue::from(retry_after));

        response
    }
}

/// Count a request against `bucket` for the caller's IP.
///
/// `Err` carries the 429 response to send back unchanged.
pub async fn check_rate_limit(
    limiter: &SlidingWindowLimiter,
    headers: &HeaderMap,
    quota: Quota,
    bucket: &str,
) -> Result<BucketStats, RateLimitError> {
    let ip = client_ip(headers);

    limiter.check(&ip, bucket, quota).await.map_err(|err| {
        tracing::warn!(
            bucket = %bucket,
            limit = err.limit,
            retry_after_seconds = err.retry_after_seconds(),
            "Rate limit exceeded"
        );
        err
    })
}

/// Middleware to enforce the route's quota
///
/// Runs before authentication so that unauthenticated floods are limited
/// too. Successful responses carry `X-RateLimit-Limit` and
/// `X-RateLimit-Remaining`.
pub async fn rate_limit(
    State(rate_state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, RateLimitError> {
    if !rate_state.enabled {
        return Ok(next.run(request).await);
    }

    let stats = check_rate_limit(
        &rate_state.limiter,
        request.headers(),
        rate_state.quota,
        rate_state.bucket,
    )
    .await?;

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(stats.limit));
    headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(stats.remaining));

    Ok(response)
}
