//! Application state container
//!
//! This module defines the shared application state that is passed
//! to all request handlers via Axum's state extraction.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::auth::Authenticator;
use crate::config::Settings;
use crate::db::{self, ApiKeyStore};
use crate::services::SlidingWindowLimiter;

/// Shared application state
///
/// Cheaply cloneable; every resource is behind an `Arc` or is itself a
/// handle.
#[derive(Clone)]
pub struct AppState {
    /// Application settings
    pub settings: Arc<Settings>,

    /// API key store shared by the authenticator and readiness checks
    pub store: Arc<dyn ApiKeyStore>,

    /// Resolves request credentials to agent identities
    pub authenticator: Authenticator,

    /// Per-IP sliding-window limiter
    pub rate_limiter: SlidingWindowLimiter,

    /// Application start time (for uptime calculation)
    pub start_time: Instant,
}

impl AppState {
    /// Create application state, connecting the configured key store
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        tracing::debug!(backend = %settings.store_backend, "Connecting API key store");
        let store = db::connect_store(&settings).await?;
        Ok(Self::with_store(settings, store))
    }

    /// Create application state around an existing store
    pub fn with_store(settings: Settings, store: Arc<dyn ApiKeyStore>) -> Self {
        let settings = Arc::new(settings);
        let authenticator = Authenticator::new(store.clone(), settings.master_api_key.clone());
        let rate_limiter = SlidingWindowLimiter::new(Duration::from_millis(settings.rate_limit.read_window_ms));

        tracing::info!(
            backend = store.backend_name(),
            rate_limit_enabled = settings.rate_limit.enabled,
            master_key_configured = settings.master_api_key.is_some(),
            "Application state initialized"
        );

        Self {
            settings,
            store,
            authenticator,
            rate_limiter,
            start_time: Instant::now(),
        }
    }

    /// Get the application uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
