//! Request authentication
//!
//! A missing, malformed or unknown credential is a normal outcome
//! (`AuthOutcome::Unauthenticated`), not an error. Only a failing key store
//! produces `Err`.

use axum::http::{header, HeaderMap};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::credentials::{fingerprint, hash_api_key, is_api_key, parse_api_key_header, parse_bearer};
use crate::db::{ApiKeyStore, StoreError};

/// Header carrying an API key without the `Bearer` scheme
pub const API_KEY_HEADER: &str = "x-api-key";

/// Agent id reported for the master key
pub const MASTER_AGENT_ID: &str = "master";

/// How a request proved its identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// `Authorization: Bearer lc_...`
    BearerKey,
    /// `x-api-key: lc_...`
    HeaderKey,
    /// The configured master key
    MasterKey,
}

/// Authenticated caller, produced per request and never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub agent_id: String,
    pub method: AuthMethod,
}

/// Result of an authentication attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Identity),
    Unauthenticated,
}

impl AuthOutcome {
    /// The identity, if authentication succeeded
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthOutcome::Authenticated(identity) => Some(identity),
            AuthOutcome::Unauthenticated => None,
        }
    }

    pub fn into_identity(self) -> Option<Identity> {
        match self {
            AuthOutcome::Authenticated(identity) => Some(identity),
            AuthOutcome::Unauthenticated => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated(_))
    }
}

/// Authenticates requests against the API key store
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn ApiKeyStore>,
    master_key: Option<String>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn ApiKeyStore>, master_key: Option<String>) -> Self {
        Self { store, master_key }
    }

    /// Authenticate via `Authorization: Bearer lc_<secret>` only.
    ///
    /// On success the key's `last_used_at` is touched in the background.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthOutcome, StoreError> {
        let Some(api_key) = header_str(headers, header::AUTHORIZATION.as_str()).and_then(parse_api_key_header) else {
            return Ok(AuthOutcome::Unauthenticated);
        };

        self.authenticate_key(api_key, AuthMethod::BearerKey).await
    }

    /// Authenticate with every supported mechanism, first success wins:
    /// bearer API key, `x-api-key` API key, then the master key.
    pub async fn authenticate_any(&self, headers: &HeaderMap) -> Result<AuthOutcome, StoreError> {
        let outcome = self.authenticate(headers).await?;
        if outcome.is_authenticated() {
            return Ok(outcome);
        }

        let header_key = header_str(headers, API_KEY_HEADER).map(str::trim);
        if let Some(api_key) = header_key.filter(|key| is_api_key(key)) {
            let outcome = self.authenticate_key(api_key, AuthMethod::HeaderKey).await?;
            if outcome.is_authenticated() {
                return Ok(outcome);
            }
        }

        if let Some(master_key) = self.master_key.as_deref() {
            let bearer = header_str(headers, header::AUTHORIZATION.as_str()).and_then(parse_bearer);
            if bearer == Some(master_key) || header_key == Some(master_key) {
                tracing::debug!("Master key authenticated");
                return Ok(AuthOutcome::Authenticated(Identity {
                    agent_id: MASTER_AGENT_ID.to_string(),
                    method: AuthMethod::MasterKey,
                }));
            }
        }

        Ok(AuthOutcome::Unauthenticated)
    }

    async fn authenticate_key(&self, api_key: &str, method: AuthMethod) -> Result<AuthOutcome, StoreError> {
        let hashed_key = hash_api_key(api_key);

        let Some(record) = self.store.find_by_hash(&hashed_key).await? else {
            tracing::warn!(key = %fingerprint(&hashed_key), method = ?method, "Unknown API key");
            return Ok(AuthOutcome::Unauthenticated);
        };

        tracing::debug!(
            key = %fingerprint(&hashed_key),
            agent_id = %record.agent_id,
            method = ?method,
            "API key authenticated"
        );

        self.touch_in_background(hashed_key);

        Ok(AuthOutcome::Authenticated(Identity {
            agent_id: record.agent_id,
            method,
        }))
    }

    /// Fire-and-forget `last_used_at` update
    fn touch_in_background(&self, hashed_key: String) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.touch_last_used(&hashed_key, Utc::now()).await {
                tracing::warn!(
                    key = %fingerprint(&hashed_key),
                    error = %e,
                    "Failed to update API key last_used_at"
                );
            }
        });
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ApiKeyRecord, MemoryApiKeyStore};
    use async_trait::async_trait;
    use axum::http::HeaderValue;
    use chrono::DateTime;

    const KEY: &str = "lc_test-secret";

    async fn authenticator_with_key(master_key: Option<&str>) -> (Authenticator, Arc<MemoryApiKeyStore>) {
        let store = Arc::new(MemoryApiKeyStore::new());
        store
            .insert(ApiKeyRecord::new(hash_api_key(KEY), "agent-42"))
            .await
            .unwrap();
        let auth = Authenticator::new(store.clone(), master_key.map(str::to_string));
        (auth, store)
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    async fn wait_for_touch(store: &MemoryApiKeyStore) -> Option<DateTime<Utc>> {
        for _ in 0..50 {
            let record = store.find_by_hash(&hash_api_key(KEY)).await.unwrap().unwrap();
            if record.last_used_at.is_some() {
                return record.last_used_at;
            }
            tokio::task::yield_now().await;
        }
        None
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthenticated() {
        let (auth, _) = authenticator_with_key(None).await;
        let outcome = auth.authenticate(&HeaderMap::new()).await.unwrap();
        assert_eq!(outcome, AuthOutcome::Unauthenticated);
    }

    #[tokio::test]
    async fn test_header_without_bearer_is_unauthenticated() {
        let (auth, _) = authenticator_with_key(None).await;
        let outcome = auth.authenticate(&headers(&[("authorization", KEY)])).await.unwrap();
        assert_eq!(outcome, AuthOutcome::Unauthenticated);

        let outcome = auth
            .authenticate(&headers(&[("authorization", "Token lc_test-secret")]))
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::Unauthenticated);
    }

    #[tokio::test]
    async fn test_bearer_without_prefix_is_unauthenticated() {
        let (auth, _) = authenticator_with_key(None).await;
        let outcome = auth
            .authenticate(&headers(&[("authorization", "Bearer test-secret")]))
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::Unauthenticated);
    }

    #[tokio::test]
    async fn test_unknown_key_is_unauthenticated() {
        let (auth, _) = authenticator_with_key(None).await;
        let outcome = auth
            .authenticate(&headers(&[("authorization", "Bearer lc_other")]))
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::Unauthenticated);
    }

    #[tokio::test]
    async fn test_valid_key_returns_agent_and_touches_last_used() {
        let (auth, store) = authenticator_with_key(None).await;
        let before = Utc::now();

        let outcome = auth
            .authenticate(&headers(&[("authorization", "Bearer lc_test-secret")]))
            .await
            .unwrap();

        let identity = outcome.into_identity().unwrap();
        assert_eq!(identity.agent_id, "agent-42");
        assert_eq!(identity.method, AuthMethod::BearerKey);

        let touched = wait_for_touch(&store).await.expect("last_used_at was not updated");
        assert!(touched >= before);
    }

    #[tokio::test]
    async fn test_authenticate_any_accepts_x_api_key() {
        let (auth, _) = authenticator_with_key(None).await;

        let outcome = auth.authenticate_any(&headers(&[("x-api-key", KEY)])).await.unwrap();
        assert_eq!(outcome.identity().map(|i| i.method), Some(AuthMethod::HeaderKey));

        // The plain bearer path does not look at x-api-key
        let outcome = auth.authenticate(&headers(&[("x-api-key", KEY)])).await.unwrap();
        assert!(!outcome.is_authenticated());
    }

    #[tokio::test]
    async fn test_authenticate_any_accepts_master_key() {
        let (auth, _) = authenticator_with_key(Some("root-secret")).await;

        let outcome = auth
            .authenticate_any(&headers(&[("authorization", "Bearer root-secret")]))
            .await
            .unwrap();
        let identity = outcome.into_identity().unwrap();
        assert_eq!(identity.agent_id, MASTER_AGENT_ID);
        assert_eq!(identity.method, AuthMethod::MasterKey);

        let outcome = auth
            .authenticate_any(&headers(&[("x-api-key", "root-secret")]))
            .await
            .unwrap();
        assert!(outcome.is_authenticated());

        let outcome = auth
            .authenticate_any(&headers(&[("authorization", "Bearer wrong")]))
            .await
            .unwrap();
        assert!(!outcome.is_authenticated());
    }

    #[tokio::test]
    async fn test_authenticate_any_prefers_bearer_key() {
        let (auth, _) = authenticator_with_key(Some("root-secret")).await;
        let outcome = auth
            .authenticate_any(&headers(&[
                ("authorization", "Bearer lc_test-secret"),
                ("x-api-key", "root-secret"),
            ]))
            .await
            .unwrap();
        assert_eq!(outcome.identity().map(|i| i.method), Some(AuthMethod::BearerKey));
    }

    struct FailingStore;

    #[async_trait]
    impl ApiKeyStore for FailingStore {
        async fn find_by_hash(&self, _: &str) -> Result<Option<ApiKeyRecord>, StoreError> {
            Err(StoreError::DynamoDb("connection refused".to_string()))
        }
        async fn touch_last_used(&self, _: &str, _: DateTime<Utc>) -> Result<(), StoreError> {
            Err(StoreError::DynamoDb("connection refused".to_string()))
        }
        async fn insert(&self, _: ApiKeyRecord) -> Result<(), StoreError> {
            Err(StoreError::DynamoDb("connection refused".to_string()))
        }
        async fn health_check(&self) -> bool {
            false
        }
        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let auth = Authenticator::new(Arc::new(FailingStore), None);
        let result = auth
            .authenticate(&headers(&[("authorization", "Bearer lc_test-secret")]))
            .await;
        assert!(matches!(result, Err(StoreError::DynamoDb(_))));

        // No credential means no lookup, so no error either
        let outcome = auth.authenticate(&HeaderMap::new()).await.unwrap();
        assert_eq!(outcome, AuthOutcome::Unauthenticated);
    }

    struct TouchFailsStore(MemoryApiKeyStore);

    #[async_trait]
    impl ApiKeyStore for TouchFailsStore {
        async fn find_by_hash(&self, hashed_key: &str) -> Result<Option<ApiKeyRecord>, StoreError> {
            self.0.find_by_hash(hashed_key).await
        }
        async fn touch_last_used(&self, _: &str, _: DateTime<Utc>) -> Result<(), StoreError> {
            Err(StoreError::DynamoDb("throttled".to_string()))
        }
        async fn insert(&self, record: ApiKeyRecord) -> Result<(), StoreError> {
            self.0.insert(record).await
        }
        async fn health_check(&self) -> bool {
            true
        }
        fn backend_name(&self) -> &'static str {
            "touch-fails"
        }
    }

    #[tokio::test]
    async fn test_touch_failure_does_not_fail_authentication() {
        let store = TouchFailsStore(MemoryApiKeyStore::new());
        store.insert(ApiKeyRecord::new(hash_api_key(KEY), "agent-42")).await.unwrap();
        let auth = Authenticator::new(Arc::new(store), None);

        let outcome = auth
            .authenticate(&headers(&[("authorization", "Bearer lc_test-secret")]))
            .await
            .unwrap();
        assert!(outcome.is_authenticated());
        tokio::task::yield_now().await;
    }
}
