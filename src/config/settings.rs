//! Application settings and configuration
//!
//! This module provides configuration management for the gateway,
//! loading settings from environment variables with sensible defaults.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    #[value(alias = "dev")]
    Development,
    #[value(alias = "stage")]
    Staging,
    #[value(alias = "prod")]
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => anyhow::bail!("Invalid environment: {}. Expected: development, staging, or production", s),
        }
    }
}

/// Which API key store backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local map, lost on restart
    #[default]
    Memory,
    /// DynamoDB table keyed by `hashed_key`
    #[value(alias = "dynamo")]
    Dynamodb,
    /// SQLite database (requires the `sqlite` feature)
    Sqlite,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Dynamodb => write!(f, "dynamodb"),
            StoreBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "mem" => Ok(StoreBackend::Memory),
            "dynamodb" | "dynamo" => Ok(StoreBackend::Dynamodb),
            "sqlite" => Ok(StoreBackend::Sqlite),
            _ => anyhow::bail!("Invalid store backend: {}. Expected: memory, dynamodb, or sqlite", s),
        }
    }
}

/// Rate limiting configuration
///
/// The read quota protects read-only endpoints such as `GET /rate-limits`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub read_limit: u32,
    pub read_window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            read_limit: 60,
            read_window_ms: 60_000,
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    // App settings
    pub app_name: String,
    pub app_version: String,
    pub environment: Environment,
    pub log_level: String,

    // Server settings
    pub host: String,
    pub port: u16,

    // Key store
    pub store_backend: StoreBackend,
    pub aws_region: String,
    pub dynamodb_endpoint_url: Option<String>,
    pub dynamodb_api_keys_table: String,
    pub sqlite_url: String,

    // Authentication
    #[serde(skip_serializing)]
    pub master_api_key: Option<String>,

    // Rate limiting
    pub rate_limit: RateLimitConfig,
}

impl Settings {
    /// Load settings from environment variables with defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignored in production typically)
        dotenvy::dotenv().ok();

        let settings = Self {
            app_name: env_or_default("APP_NAME", "agent-gateway"),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: env_or_default("ENVIRONMENT", "development")
                .parse()
                .unwrap_or_default(),
            log_level: env_or_default("LOG_LEVEL", "info"),

            host: env_or_default("HOST", "0.0.0.0"),
            port: env_or_default("PORT", "8000")
                .parse()
                .context("Invalid PORT value")?,

            store_backend: env_or_default("STORE_BACKEND", "memory")
                .parse()
                .context("Invalid STORE_BACKEND value")?,
            aws_region: env_or_default("AWS_REGION", "us-east-1"),
            dynamodb_endpoint_url: env::var("DYNAMODB_ENDPOINT_URL").ok(),
            dynamodb_api_keys_table: env_or_default(
                "DYNAMODB_API_KEYS_TABLE",
                "agent-gateway-api-keys",
            ),
            sqlite_url: env_or_default("SQLITE_URL", "sqlite://agent-gateway.db?mode=rwc"),

            master_api_key: env::var("MASTER_API_KEY").ok().filter(|k| !k.is_empty()),

            rate_limit: RateLimitConfig {
                enabled: env_or_default("RATE_LIMIT_ENABLED", "true")
                    .parse()
                    .unwrap_or(true),
                read_limit: env_or_default("RATE_LIMIT_READ_LIMIT", "60")
                    .parse()
                    .unwrap_or(60),
                read_window_ms: env_or_default("RATE_LIMIT_READ_WINDOW_MS", "60000")
                    .parse()
                    .unwrap_or(60_000),
            },
        };

        settings.validate()?;

        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("Port cannot be 0");
        }

        if self.rate_limit.enabled {
            if self.rate_limit.read_limit == 0 {
                anyhow::bail!("Rate limit read_limit must be > 0");
            }
            if self.rate_limit.read_window_ms == 0 {
                anyhow::bail!("Rate limit read_window_ms must be > 0");
            }
        }

        if self.store_backend == StoreBackend::Sqlite && !cfg!(feature = "sqlite") {
            anyhow::bail!("STORE_BACKEND=sqlite requires building with the `sqlite` feature");
        }

        if self.environment == Environment::Production && self.store_backend == StoreBackend::Memory {
            tracing::warn!("Running in production with the in-memory key store!");
        }

        Ok(())
    }

    /// Get the server address string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "agent-gateway".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: Environment::Development,
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            store_backend: StoreBackend::Memory,
            aws_region: "us-east-1".to_string(),
            dynamodb_endpoint_url: None,
            dynamodb_api_keys_table: "agent-gateway-api-keys".to_string(),
            sqlite_url: "sqlite://agent-gateway.db?mode=rwc".to_string(),
            master_api_key: None,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Helper function to get environment variable with default
fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
