use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};

use crate::errors::ServiceError;
use crate::storage::entity_store::{key_matches, CasOutcome, EntityStore};

/// In-process backend. Each conditional write runs under the shard lock of its key,
/// so concurrent writers to the same key are linearized.
#[derive(Default)]
pub struct MemoryStore {
    map: DashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.map.len() }

    pub fn is_empty(&self) -> bool { self.map.is_empty() }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ServiceError> {
        Ok(self.map.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, payload: Vec<u8>) -> Result<(), ServiceError> {
        self.map.insert(key.to_string(), payload);
        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        payload: Vec<u8>,
    ) -> Result<CasOutcome, ServiceError> {
        let outcome = match (self.map.entry(key.to_string()), expected) {
            (Entry::Occupied(mut current), Some(expected)) if current.get().as_slice() == expected => {
                current.insert(payload);
                CasOutcome::Applied
            }
            (Entry::Vacant(slot), None) => {
                slot.insert(payload);
                CasOutcome::Applied
            }
            _ => CasOutcome::Conflict,
        };
        Ok(outcome)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ServiceError> {
        Ok(self
            .map
            .iter()
            .filter(|entry| key_matches(pattern, entry.key()))
            .map(|entry| entry.key().clone())
            .collect())
    }
}
