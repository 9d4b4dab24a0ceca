//! Fault-injecting `EntityStore` wrappers for exercising retry and timeout paths.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::ServiceError;
use crate::storage::{CasOutcome, EntityStore, MemoryStore};

/// Delays every call before delegating.
pub struct SlowStore<S> {
    inner: S,
    delay: Duration,
}

impl<S> SlowStore<S> {
    pub fn new(inner: S, delay: Duration) -> Self { Self { inner, delay } }
}

#[async_trait]
impl<S: EntityStore> EntityStore for SlowStore<S> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ServiceError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, payload: Vec<u8>) -> Result<(), ServiceError> {
        tokio::time::sleep(self.delay).await;
        self.inner.set(key, payload).await
    }

    async fn compare_and_set(&self, key: &str, expected: Option<&[u8]>, payload: Vec<u8>) -> Result<CasOutcome, ServiceError> {
        tokio::time::sleep(self.delay).await;
        self.inner.compare_and_set(key, expected, payload).await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ServiceError> {
        tokio::time::sleep(self.delay).await;
        self.inner.keys(pattern).await
    }
}

/// Backend that is down: every call fails.
pub struct DownStore;

fn down() -> ServiceError { ServiceError::StoreUnavailable("connection refused".into()) }

#[async_trait]
impl EntityStore for DownStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, ServiceError> { Err(down()) }
    async fn set(&self, _key: &str, _payload: Vec<u8>) -> Result<(), ServiceError> { Err(down()) }
    async fn compare_and_set(&self, _key: &str, _expected: Option<&[u8]>, _payload: Vec<u8>) -> Result<CasOutcome, ServiceError> { Err(down()) }
    async fn keys(&self, _pattern: &str) -> Result<Vec<String>, ServiceError> { Err(down()) }
}

/// Memory store whose reads of the listed keys fail, as a flaky backend would.
pub struct FlakyReadStore {
    pub inner: MemoryStore,
    failing: Vec<String>,
}

impl FlakyReadStore {
    pub fn new(inner: MemoryStore, failing: Vec<String>) -> Self { Self { inner, failing } }
}

#[async_trait]
impl EntityStore for FlakyReadStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ServiceError> {
        if self.failing.iter().any(|k| k == key) {
            return Err(down());
        }
        self.inner.get(key).await
    }
    async fn set(&self, key: &str, payload: Vec<u8>) -> Result<(), ServiceError> { self.inner.set(key, payload).await }
    async fn compare_and_set(&self, key: &str, expected: Option<&[u8]>, payload: Vec<u8>) -> Result<CasOutcome, ServiceError> {
        self.inner.compare_and_set(key, expected, payload).await
    }
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ServiceError> { self.inner.keys(pattern).await }
}

/// Simulates a concurrent writer: before each of the first `races` conditional
/// writes, the stored payload is replaced by `interloper(current)`.
pub struct RacingStore {
    pub inner: MemoryStore,
    races: AtomicUsize,
    interloper: Box<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>,
    pub cas_calls: AtomicUsize,
}

impl RacingStore {
    pub fn new<F>(inner: MemoryStore, races: usize, interloper: F) -> Self
    where
        F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
    {
        Self { inner, races: AtomicUsize::new(races), interloper: Box::new(interloper), cas_calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl EntityStore for RacingStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ServiceError> { self.inner.get(key).await }
    async fn set(&self, key: &str, payload: Vec<u8>) -> Result<(), ServiceError> { self.inner.set(key, payload).await }

    async fn compare_and_set(&self, key: &str, expected: Option<&[u8]>, payload: Vec<u8>) -> Result<CasOutcome, ServiceError> {
        self.cas_calls.fetch_add(1, Ordering::SeqCst);
        let race = self.races.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok();
        if race {
            if let Some(current) = self.inner.get(key).await? {
                self.inner.set(key, (self.interloper)(&current)).await?;
            }
        }
        self.inner.compare_and_set(key, expected, payload).await
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ServiceError> { self.inner.keys(pattern).await }
}

/// Drops `compare_and_set` the first time it would block, as a timeout firing
/// mid-write does. Every other call passes through.
pub struct AbandonedCasStore {
    pub inner: Arc<dyn EntityStore>,
    pub abandoned: AtomicUsize,
}

impl AbandonedCasStore {
    pub fn new(inner: Arc<dyn EntityStore>) -> Self { Self { inner, abandoned: AtomicUsize::new(0) } }
}

#[async_trait]
impl EntityStore for AbandonedCasStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ServiceError> { self.inner.get(key).await }
    async fn set(&self, key: &str, payload: Vec<u8>) -> Result<(), ServiceError> { self.inner.set(key, payload).await }

    async fn compare_and_set(&self, key: &str, expected: Option<&[u8]>, payload: Vec<u8>) -> Result<CasOutcome, ServiceError> {
        let mut write = self.inner.compare_and_set(key, expected, payload);
        let polled = std::future::poll_fn(|cx| match write.as_mut().poll(cx) {
            Poll::Ready(outcome) => Poll::Ready(Some(outcome)),
            Poll::Pending => Poll::Ready(None),
        })
        .await;
        drop(write);
        match polled {
            Some(outcome) => outcome,
            None => {
                self.abandoned.fetch_add(1, Ordering::SeqCst);
                Err(ServiceError::StoreUnavailable("write abandoned mid-flight".into()))
            }
        }
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ServiceError> { self.inner.keys(pattern).await }
}
