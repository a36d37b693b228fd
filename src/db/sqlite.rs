//! SQLite API key store (feature `sqlite`)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::db::models::ApiKeyRecord;
use crate::db::store::{ApiKeyStore, StoreError};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS api_keys (\
    hashed_key TEXT PRIMARY KEY NOT NULL, \
    agent_id TEXT NOT NULL, \
    name TEXT, \
    created_at INTEGER NOT NULL, \
    last_used_at INTEGER\
)";

/// API key store backed by a SQLite database.
///
/// Timestamps are stored as Unix milliseconds.
#[derive(Clone)]
pub struct SqliteApiKeyStore {
    pool: SqlitePool,
}

impl SqliteApiKeyStore {
    /// Connect to `url` and make sure the `api_keys` table exists
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        // Each connection to `:memory:` is its own database, so keep exactly one alive
        let in_memory = url.contains(":memory:");
        let mut options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
        if in_memory {
            options = options.idle_timeout(None).max_lifetime(None);
        }

        let pool = options
            .connect(url)
            .await
            .map_err(sqlite_err)?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(sqlite_err)?;
        Ok(())
    }
}

#[async_trait]
impl ApiKeyStore for SqliteApiKeyStore {
    async fn find_by_hash(&self, hashed_key: &str) -> Result<Option<ApiKeyRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT hashed_key, agent_id, name, created_at, last_used_at \
             FROM api_keys WHERE hashed_key = ?",
        )
        .bind(hashed_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(sqlite_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let created_at: i64 = row.try_get("created_at").map_err(sqlite_err)?;
        let last_used_at: Option<i64> = row.try_get("last_used_at").map_err(sqlite_err)?;

        Ok(Some(ApiKeyRecord {
            hashed_key: row.try_get("hashed_key").map_err(sqlite_err)?,
            agent_id: row.try_get("agent_id").map_err(sqlite_err)?,
            name: row.try_get("name").map_err(sqlite_err)?,
            created_at: DateTime::from_timestamp_millis(created_at)
                .ok_or_else(|| StoreError::ParseError(format!("bad created_at: {created_at}")))?,
            last_used_at: last_used_at.and_then(DateTime::from_timestamp_millis),
        }))
    }

    async fn touch_last_used(&self, hashed_key: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE api_keys SET last_used_at = ? WHERE hashed_key = ?")
            .bind(at.timestamp_millis())
            .bind(hashed_key)
            .execute(&self.pool)
            .await
            .map_err(sqlite_err)?;
        Ok(())
    }

    async fn insert(&self, record: ApiKeyRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO api_keys (hashed_key, agent_id, name, created_at, last_used_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&record.hashed_key)
        .bind(&record.agent_id)
        .bind(&record.name)
        .bind(record.created_at.timestamp_millis())
        .bind(record.last_used_at.map(|t| t.timestamp_millis()))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::Duplicate)
            }
            Err(e) => Err(sqlite_err(e)),
        }
    }

    async fn health_check(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "SQLite health check failed");
                false
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

fn sqlite_err(e: sqlx::Error) -> StoreError {
    StoreError::Sqlite(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteApiKeyStore {
        SqliteApiKeyStore::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_find_and_touch() {
        let store = memory_store().await;
        store
            .insert(ApiKeyRecord::new("h1", "agent-1").with_name("laptop"))
            .await
            .unwrap();

        let found = store.find_by_hash("h1").await.unwrap().unwrap();
        assert_eq!(found.agent_id, "agent-1");
        assert_eq!(found.name.as_deref(), Some("laptop"));
        assert!(found.last_used_at.is_none());

        let now = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        store.touch_last_used("h1", now).await.unwrap();
        let found = store.find_by_hash("h1").await.unwrap().unwrap();
        assert_eq!(found.last_used_at, Some(now));
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = memory_store().await;
        store.insert(ApiKeyRecord::new("h1", "agent-1")).await.unwrap();

        let err = store.insert(ApiKeyRecord::new("h1", "agent-2")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }

    #[tokio::test]
    async fn test_unknown_hash() {
        let store = memory_store().await;
        assert!(store.find_by_hash("nope").await.unwrap().is_none());
        store.touch_last_used("nope", Utc::now()).await.unwrap();
        assert!(store.health_check().await);
    }
}
