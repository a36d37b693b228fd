//! Services module
//!
//! Contains in-process services shared across handlers.

pub mod rate_limiter;

pub use rate_limiter::{BucketStats, Quota, RateLimitError, RateLimitStats, SlidingWindowLimiter};
