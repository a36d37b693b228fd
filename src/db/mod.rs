//! Database module
//!
//! Contains the API key store trait and its backends.

pub mod dynamodb;
pub mod memory;
pub mod models;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod store;

pub use dynamodb::DynamoDbApiKeyStore;
pub use memory::MemoryApiKeyStore;
pub use models::ApiKeyRecord;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteApiKeyStore;
pub use store::{ApiKeyStore, StoreError};

use std::sync::Arc;

use crate::config::{create_dynamodb_client, Settings, StoreBackend};

/// Build the key store selected by `settings.store_backend`
pub async fn connect_store(settings: &Settings) -> anyhow::Result<Arc<dyn ApiKeyStore>> {
    let store: Arc<dyn ApiKeyStore> = match settings.store_backend {
        StoreBackend::Memory => Arc::new(MemoryApiKeyStore::new()),
        StoreBackend::Dynamodb => {
            let client = create_dynamodb_client(settings).await;
            Arc::new(DynamoDbApiKeyStore::new(
                client,
                settings.dynamodb_api_keys_table.clone(),
            ))
        }
        #[cfg(feature = "sqlite")]
        StoreBackend::Sqlite => Arc::new(SqliteApiKeyStore::connect(&settings.sqlite_url).await?),
        #[cfg(not(feature = "sqlite"))]
        StoreBackend::Sqlite => {
            anyhow::bail!("STORE_BACKEND=sqlite requires building with the `sqlite` feature")
        }
    };

    tracing::info!(backend = store.backend_name(), "API key store ready");
    Ok(store)
}
