//! Rate limit reporting endpoint
//!
//! GET /rate-limits returns the caller's own sliding-window consumption.
//! The route is limited by the read quota in `server::routes` before this
//! handler runs.

use axum::{extract::State, http::HeaderMap, Json};
use serde::Serialize;

use crate::error::ApiError;
use crate::server::state::AppState;
use crate::services::RateLimitStats;
use crate::utils::{client_ip, mask_ip_digits};

/// Bucket name the endpoint counts its own requests under
pub const RATE_LIMITS_BUCKET: &str = "rate-limits";

/// Fixed explanatory note included in every report
pub const RATE_LIMITS_NOTE: &str = "Rate limits are per-IP and reset on a sliding window basis.";

/// Response body for GET /rate-limits
#[derive(Debug, Serialize)]
pub struct RateLimitsResponse {
    /// Client IP with every digit replaced by `*`
    pub ip_hash: String,
    pub limits: RateLimitStats,
    pub note: &'static str,
}

/// Report the caller's rate limit consumption
///
/// # Errors
/// - 401 Unauthorized: no authentication mechanism succeeded
/// - 500 Internal Server Error: the key store failed
pub async fn get_rate_limits(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RateLimitsResponse>, ApiError> {
    let Some(identity) = state.authenticator.authenticate_any(&headers).await?.into_identity() else {
        return Err(ApiError::Unauthorized);
    };

    let ip = client_ip(&headers);
    let limits = state.rate_limiter.stats(&ip).await;

    tracing::debug!(
        agent_id = %identity.agent_id,
        method = ?identity.method,
        buckets = limits.len(),
        "Reporting rate limits"
    );

    Ok(Json(RateLimitsResponse {
        ip_hash: mask_ip_digits(&ip),
        limits,
        note: RATE_LIMITS_NOTE,
    }))
}
