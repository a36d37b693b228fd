//! In-memory API key store
//!
//! Used for local development and tests. Contents are lost on restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::db::models::ApiKeyRecord;
use crate::db::store::{ApiKeyStore, StoreError};

/// Process-local API key store backed by a `HashMap`
#[derive(Debug, Default)]
pub struct MemoryApiKeyStore {
    records: RwLock<HashMap<String, ApiKeyRecord>>,
}

impl MemoryApiKeyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no keys
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ApiKeyStore for MemoryApiKeyStore {
    async fn find_by_hash(&self, hashed_key: &str) -> Result<Option<ApiKeyRecord>, StoreError> {
        Ok(self.records.read().await.get(hashed_key).cloned())
    }

    async fn touch_last_used(&self, hashed_key: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        if let Some(record) = self.records.write().await.get_mut(hashed_key) {
            record.last_used_at = Some(at);
        }
        Ok(())
    }

    async fn insert(&self, record: ApiKeyRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.hashed_key) {
            return Err(StoreError::Duplicate);
        }
        records.insert(record.hashed_key.clone(), record);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryApiKeyStore::new();
        store.insert(ApiKeyRecord::new("h1", "agent-1")).await.unwrap();

        let found = store.find_by_hash("h1").await.unwrap().unwrap();
        assert_eq!(found.agent_id, "agent-1");
        assert!(store.find_by_hash("h2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = MemoryApiKeyStore::new();
        store.insert(ApiKeyRecord::new("h1", "agent-1")).await.unwrap();

        let err = store.insert(ApiKeyRecord::new("h1", "agent-2")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_touch_last_used() {
        let store = MemoryApiKeyStore::new();
        store.insert(ApiKeyRecord::new("h1", "agent-1")).await.unwrap();

        let now = Utc::now();
        store.touch_last_used("h1", now).await.unwrap();
        assert_eq!(store.find_by_hash("h1").await.unwrap().unwrap().last_used_at, Some(now));

        // Unknown hashes are a no-op
        store.touch_last_used("missing", now).await.unwrap();
        assert_eq!(store.len().await, 1);
    }
}
