//! Middleware module
//!
//! Contains HTTP middleware for request logging and rate limiting.

pub mod logging;
pub mod rate_limit;

pub use logging::{log_request, TraceId, REQUEST_ID_HEADER, TRACE_ID_HEADER};
pub use rate_limit::{check_rate_limit, rate_limit, RateLimitState};
