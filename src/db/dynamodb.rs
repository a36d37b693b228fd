//! DynamoDB API key store
//!
//! The api keys table uses `hashed_key` (S) as its partition key. Every
//! operation is a single-item request keyed by that hash.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoDbSdkClient;
use chrono::{DateTime, Utc};

use crate::db::models::ApiKeyRecord;
use crate::db::store::{ApiKeyStore, StoreError};

/// API key store backed by a DynamoDB table.
#[derive(Clone)]
pub struct DynamoDbApiKeyStore {
    /// AWS DynamoDB SDK client
    client: DynamoDbSdkClient,

    /// Table holding the key records
    table_name: String,
}

impl DynamoDbApiKeyStore {
    /// Create a new DynamoDB-backed store.
    ///
    /// # Arguments
    /// * `client` - AWS DynamoDB SDK client
    /// * `table_name` - Name of the api keys table
    pub fn new(client: DynamoDbSdkClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Get the API keys table name
    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

#[async_trait]
impl ApiKeyStore for DynamoDbApiKeyStore {
    async fn find_by_hash(&self, hashed_key: &str) -> Result<Option<ApiKeyRecord>, StoreError> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("hashed_key", AttributeValue::S(hashed_key.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::DynamoDb(e.to_string()))?;

        let Some(item) = result.item else {
            return Ok(None);
        };

        ApiKeyRecord::from_dynamodb(&item)
            .map(Some)
            .ok_or_else(|| StoreError::ParseError("Failed to parse API key record".to_string()))
    }

    async fn touch_last_used(&self, hashed_key: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        // UpdateItem upserts by default, so guard against creating a bare item
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("hashed_key", AttributeValue::S(hashed_key.to_string()))
            .update_expression("SET last_used_at = :now")
            .condition_expression("attribute_exists(hashed_key)")
            .expression_attribute_values(":now", AttributeValue::N(at.timestamp_millis().to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Ok(())
            }
            Err(e) => Err(StoreError::DynamoDb(e.to_string())),
        }
    }

    async fn insert(&self, record: ApiKeyRecord) -> Result<(), StoreError> {
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(record.to_dynamodb()))
            .condition_expression("attribute_not_exists(hashed_key)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
            {
                Err(StoreError::Duplicate)
            }
            Err(e) => Err(StoreError::DynamoDb(e.to_string())),
        }
    }

    /// Performs a cheap `DescribeTable` on the api keys table.
    async fn health_check(&self) -> bool {
        match self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
        {
            Ok(_) => {
                tracing::debug!(table = %self.table_name, "DynamoDB health check passed");
                true
            }
            Err(e) => {
                tracing::warn!(table = %self.table_name, error = %e, "DynamoDB health check failed");
                false
            }
        }
    }

    fn backend_name(&self) -> &'static str {
        "dynamodb"
    }
}
