use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::errors::ServiceError;
use crate::storage::entity_store::{CasOutcome, EntityStore};

/// Decorator bounding every backend call by a timeout.
/// An elapsed call surfaces as `StoreUnavailable`; the pending call is dropped.
pub struct TimedStore {
    inner: Arc<dyn EntityStore>,
    timeout: Duration,
}

impl TimedStore {
    pub fn new(inner: Arc<dyn EntityStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T, F>(&self, op: &str, key: &str, call: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        tokio::time::timeout(self.timeout, call).await.unwrap_or_else(|_| {
            Err(ServiceError::StoreUnavailable(format!(
                "{op} `{key}` timed out after {}ms",
                self.timeout.as_millis()
            )))
        })
    }
}

#[async_trait]
impl EntityStore for TimedStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ServiceError> {
        self.bounded("get", key, self.inner.get(key)).await
    }

    async fn set(&self, key: &str, payload: Vec<u8>) -> Result<(), ServiceError> {
        self.bounded("set", key, self.inner.set(key, payload)).await
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        payload: Vec<u8>,
    ) -> Result<CasOutcome, ServiceError> {
        self.bounded("compare_and_set", key, self.inner.compare_and_set(key, expected, payload)).await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ServiceError> {
        self.bounded("keys", pattern, self.inner.keys(pattern)).await
    }
}
