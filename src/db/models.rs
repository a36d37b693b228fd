//! API key data model
//!
//! Only the SHA-256 digest of a key is ever persisted. The raw `lc_...`
//! credential exists in memory for the duration of a request and is shown
//! once to the operator by `create_api_key`.

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stored API key record.
///
/// Stored in the api keys table with `hashed_key` as partition key.
/// Timestamps are persisted as Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    /// Lowercase hex SHA-256 of the full `lc_...` credential (partition key)
    pub hashed_key: String,

    /// Agent this key authenticates as
    pub agent_id: String,

    /// Human-readable label for the key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// When the key was minted
    pub created_at: DateTime<Utc>,

    /// Last successful authentication with this key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ApiKeyRecord {
    /// Create a fresh record for a newly minted key
    pub fn new(hashed_key: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            hashed_key: hashed_key.into(),
            agent_id: agent_id.into(),
            name: None,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }

    /// Attach a human-readable name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Parse from DynamoDB item
    pub fn from_dynamodb(item: &HashMap<String, AttributeValue>) -> Option<Self> {
        Some(Self {
            hashed_key: get_string(item, "hashed_key")?,
            agent_id: get_string(item, "agent_id")?,
            name: get_string(item, "name"),
            created_at: get_millis(item, "created_at").unwrap_or_default(),
            last_used_at: get_millis(item, "last_used_at"),
        })
    }

    /// Convert into a DynamoDB item
    pub fn to_dynamodb(&self) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();
        item.insert("hashed_key".to_string(), AttributeValue::S(self.hashed_key.clone()));
        item.insert("agent_id".to_string(), AttributeValue::S(self.agent_id.clone()));
        item.insert(
            "created_at".to_string(),
            AttributeValue::N(self.created_at.timestamp_millis().to_string()),
        );
        if let Some(name) = &self.name {
            item.insert("name".to_string(), AttributeValue::S(name.clone()));
        }
        if let Some(last_used_at) = self.last_used_at {
            item.insert(
                "last_used_at".to_string(),
                AttributeValue::N(last_used_at.timestamp_millis().to_string()),
            );
        }
        item
    }
}

fn get_string(item: &HashMap<String, AttributeValue>, key: &str) -> Option<String> {
    item.get(key).and_then(|v| v.as_s().ok()).map(|s| s.to_string())
}

fn get_millis(item: &HashMap<String, AttributeValue>, key: &str) -> Option<DateTime<Utc>> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse::<i64>().ok())
        .and_then(DateTime::from_timestamp_millis)
}
