use std::collections::HashSet;

use async_trait::async_trait;

/// Answers "may this caller mutate objects". Consulted by the HTTP layer before
/// create/reserve/unreserve; the reservation engine itself never authenticates.
/// Implementations can be static, file-backed, or a remote authority.
#[async_trait]
pub trait CapabilityCheck: Send + Sync {
    async fn authorize(&self, credential: Option<&str>) -> bool;
}

/// Every caller is authorized.
pub struct AllowAll;

#[async_trait]
impl CapabilityCheck for AllowAll {
    async fn authorize(&self, _credential: Option<&str>) -> bool { true }
}

/// Caller must present one of a fixed set of API keys.
pub struct ApiKeyCapability {
    keys: HashSet<String>,
}

impl ApiKeyCapability {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { keys: keys.into_iter().map(Into::into).collect() }
    }
}

#[async_trait]
impl CapabilityCheck for ApiKeyCapability {
    async fn authorize(&self, credential: Option<&str>) -> bool {
        match credential.map(str::trim) {
            Some(key) if !key.is_empty() => self.keys.contains(key),
            _ => false,
        }
    }
}
