//! API key store abstraction
//!
//! Handlers never talk to a concrete database. They receive an
//! `Arc<dyn ApiKeyStore>` through application state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::models::ApiKeyRecord;

/// Point lookup and point update of API key records by hashed key.
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    /// Look up the record whose stored hash equals `hashed_key`
    async fn find_by_hash(&self, hashed_key: &str) -> Result<Option<ApiKeyRecord>, StoreError>;

    /// Set `last_used_at` on the record keyed by `hashed_key`
    ///
    /// Implementations issue a single keyed update. Updating a hash that is
    /// not present is not an error.
    async fn touch_last_used(&self, hashed_key: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Insert a new record, failing if the hash already exists
    async fn insert(&self, record: ApiKeyRecord) -> Result<(), StoreError>;

    /// Check whether the backing store is reachable
    async fn health_check(&self) -> bool;

    /// Short backend name for logs and readiness output
    fn backend_name(&self) -> &'static str;
}

/// Errors that can occur during API key store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("DynamoDB error: {0}")]
    DynamoDb(String),

    #[error("SQLite error: {0}")]
    Sqlite(String),

    #[error("API key already exists")]
    Duplicate,

    #[error("Parse error: {0}")]
    ParseError(String),
}
