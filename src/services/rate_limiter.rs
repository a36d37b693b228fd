//! Sliding-window rate limiter
//!
//! Every client IP owns one request log per bucket (usually a route name).
//! A request is admitted when fewer than `limit` requests were admitted in
//! the trailing `window`. Logs for idle IPs are evicted by the cache.

use moka::future::Cache;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Maximum number of client IPs tracked at once
const MAX_TRACKED_IPS: u64 = 10_000;

/// Shortest idle time before an IP's logs are dropped
const MIN_IDLE: Duration = Duration::from_secs(60);

/// Allowed requests per sliding window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u32,
    pub window: Duration,
}

impl Quota {
    pub fn new(limit: u32, window_ms: u64) -> Self {
        Self {
            limit,
            window: Duration::from_millis(window_ms),
        }
    }
}

/// Consumption of one bucket for one IP
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketStats {
    pub limit: u32,
    pub window_ms: u64,
    pub used: u32,
    pub remaining: u32,
    /// Milliseconds until the oldest counted request leaves the window
    pub reset_ms: u64,
}

/// Snapshot of every bucket recorded for an IP, keyed by bucket name
pub type RateLimitStats = BTreeMap<String, BucketStats>;

/// Request rejected because the bucket is full
#[derive(Debug, Clone, thiserror::Error)]
#[error("rate limit exceeded for bucket '{bucket}' ({limit} per {window:?})")]
pub struct RateLimitError {
    pub bucket: String,
    pub limit: u32,
    pub window: Duration,
    /// Time until a slot frees up
    pub retry_after: Duration,
}

impl RateLimitError {
    /// `retry_after` rounded up to whole seconds, never below 1
    pub fn retry_after_seconds(&self) -> u64 {
        let secs = self.retry_after.as_secs() + u64::from(self.retry_after.subsec_nanos() > 0);
        secs.max(1)
    }
}

#[derive(Debug)]
struct WindowLog {
    quota: Quota,
    hits: VecDeque<Instant>,
}

impl WindowLog {
    fn new(quota: Quota) -> Self {
        Self {
            quota,
            hits: VecDeque::new(),
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.hits.front() {
            if now.saturating_duration_since(oldest) >= self.quota.window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
    }

    fn reset_in(&self, now: Instant) -> Duration {
        self.hits
            .front()
            .map(|&oldest| self.quota.window.saturating_sub(now.saturating_duration_since(oldest)))
            .unwrap_or_default()
    }

    fn stats(&self, now: Instant) -> BucketStats {
        let used = u32::try_from(self.hits.len()).unwrap_or(u32::MAX);
        BucketStats {
            limit: self.quota.limit,
            window_ms: u64::try_from(self.quota.window.as_millis()).unwrap_or(u64::MAX),
            used,
            remaining: self.quota.limit.saturating_sub(used),
            reset_ms: u64::try_from(self.reset_in(now).as_millis()).unwrap_or(u64::MAX),
        }
    }
}

type IpWindows = Arc<Mutex<HashMap<String, WindowLog>>>;

/// In-process sliding-window limiter keyed by client IP and bucket
#[derive(Clone)]
pub struct SlidingWindowLimiter {
    windows: Cache<String, IpWindows>,
}

impl SlidingWindowLimiter {
    /// Create a limiter whose per-IP state lives at least as long as
    /// `longest_window` after the IP's last request
    pub fn new(longest_window: Duration) -> Self {
        let windows = Cache::builder()
            .max_capacity(MAX_TRACKED_IPS)
            .time_to_idle(longest_window.max(MIN_IDLE))
            .build();

        Self { windows }
    }

    /// Record a request for `(ip, bucket)` if the quota allows it.
    ///
    /// Returns the bucket's consumption after the request was counted.
    pub async fn check(&self, ip: &str, bucket: &str, quota: Quota) -> Result<BucketStats, RateLimitError> {
        self.check_at(ip, bucket, quota, Instant::now()).await
    }

    /// Current consumption of every bucket for `ip`
    pub async fn stats(&self, ip: &str) -> RateLimitStats {
        self.stats_at(ip, Instant::now()).await
    }

    pub(crate) async fn check_at(
        &self,
        ip: &str,
        bucket: &str,
        quota: Quota,
        now: Instant,
    ) -> Result<BucketStats, RateLimitError> {
        let windows = self
            .windows
            .get_with(ip.to_string(), async { Arc::new(Mutex::new(HashMap::new())) })
            .await;

        let mut windows = windows.lock().unwrap_or_else(PoisonError::into_inner);
        let log = windows
            .entry(bucket.to_string())
            .or_insert_with(|| WindowLog::new(quota));
        log.quota = quota;
        log.prune(now);

        if log.hits.len() >= quota.limit as usize {
            return Err(RateLimitError {
                bucket: bucket.to_string(),
                limit: quota.limit,
                window: quota.window,
                retry_after: log.reset_in(now),
            });
        }

        log.hits.push_back(now);
        Ok(log.stats(now))
    }

    pub(crate) async fn stats_at(&self, ip: &str, now: Instant) -> RateLimitStats {
        let Some(windows) = self.windows.get(ip).await else {
            return RateLimitStats::new();
        };

        let mut windows = windows.lock().unwrap_or_else(PoisonError::into_inner);
        windows
            .iter_mut()
            .map(|(bucket, log)| {
                log.prune(now);
                (bucket.clone(), log.stats(now))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quota(limit: u32, window_ms: u64) -> Quota {
        Quota::new(limit, window_ms)
    }

    #[tokio::test]
    async fn test_admits_exactly_limit_requests() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(60));
        let now = Instant::now();

        for i in 0..3 {
            let stats = limiter.check_at("1.2.3.4", "read", quota(3, 1_000), now).await.unwrap();
            assert_eq!(stats.used, i + 1);
            assert_eq!(stats.remaining, 2 - i);
        }

        let err = limiter.check_at("1.2.3.4", "read", quota(3, 1_000), now).await.unwrap_err();
        assert_eq!(err.limit, 3);
        assert_eq!(err.bucket, "read");
        assert_eq!(err.retry_after, Duration::from_millis(1_000));
        assert_eq!(err.retry_after_seconds(), 1);
    }

    #[tokio::test]
    async fn test_window_slides() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(60));
        let start = Instant::now();

        limiter.check_at("ip", "read", quota(2, 1_000), start).await.unwrap();
        limiter
            .check_at("ip", "read", quota(2, 1_000), start + Duration::from_millis(600))
            .await
            .unwrap();
        assert!(limiter
            .check_at("ip", "read", quota(2, 1_000), start + Duration::from_millis(900))
            .await
            .is_err());

        // The first hit has left the window, the second has not
        let stats = limiter
            .check_at("ip", "read", quota(2, 1_000), start + Duration::from_millis(1_000))
            .await
            .unwrap();
        assert_eq!(stats.used, 2);
        assert_eq!(stats.reset_ms, 600);
    }

    #[tokio::test]
    async fn test_ips_and_buckets_are_independent() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(60));
        let now = Instant::now();

        limiter.check_at("a", "read", quota(1, 1_000), now).await.unwrap();
        assert!(limiter.check_at("a", "read", quota(1, 1_000), now).await.is_err());
        assert!(limiter.check_at("b", "read", quota(1, 1_000), now).await.is_ok());
        assert!(limiter.check_at("a", "write", quota(1, 1_000), now).await.is_ok());
    }

    #[tokio::test]
    async fn test_stats_snapshot() {
        let limiter = SlidingWindowLimiter::new(Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.stats_at("9.9.9.9", start).await.is_empty());

        limiter.check_at("9.9.9.9", "rate-limits", quota(5, 2_000), start).await.unwrap();
        limiter.check_at("9.9.9.9", "rate-limits", quota(5, 2_000), start).await.unwrap();

        let stats = limiter.stats_at("9.9.9.9", start + Duration::from_millis(500)).await;
        assert_eq!(
            stats.get("rate-limits"),
            Some(&BucketStats {
                limit: 5,
                window_ms: 2_000,
                used: 2,
                remaining: 3,
                reset_ms: 1_500,
            })
        );

        let stats = limiter.stats_at("9.9.9.9", start + Duration::from_millis(2_000)).await;
        assert_eq!(stats["rate-limits"].used, 0);
        assert_eq!(stats["rate-limits"].reset_ms, 0);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let err = RateLimitError {
            bucket: "read".to_string(),
            limit: 1,
            window: Duration::from_secs(60),
            retry_after: Duration::from_millis(2_100),
        };
        assert_eq!(err.retry_after_seconds(), 3);

        let err = RateLimitError {
            retry_after: Duration::ZERO,
            ..err
        };
        assert_eq!(err.retry_after_seconds(), 1);
    }
}
