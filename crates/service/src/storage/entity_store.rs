use async_trait::async_trait;

use crate::errors::ServiceError;

/// Pattern matching every key.
pub const ALL_KEYS: &str = "*";

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    Applied,
    /// The stored value no longer matched the expected one; nothing was written.
    Conflict,
}

/// Key-value backend contract used by the reservation engine.
/// Implementations can be in-process, file-backed, or a remote KV.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Payload stored under `key`, or `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ServiceError>;

    /// Unconditional write.
    async fn set(&self, key: &str, payload: Vec<u8>) -> Result<(), ServiceError>;

    /// Write `payload` only if the current value equals `expected`.
    /// `expected = None` means the key must not exist yet.
    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        payload: Vec<u8>,
    ) -> Result<CasOutcome, ServiceError>;

    /// Keys matching `pattern` (`*`, `prefix*` or an exact key). No ordering is guaranteed.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ServiceError>;
}

/// Redis `KEYS`-style matching restricted to a trailing wildcard.
pub fn key_matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => pattern == key,
    }
}
