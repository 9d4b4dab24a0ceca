use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use tokio::{fs, sync::RwLock};

use crate::errors::ServiceError;
use crate::storage::entity_store::{key_matches, CasOutcome, EntityStore};

/// JSON file-backed key-value store.
///
/// Persists a `key -> payload` map to a single JSON file. Every mutation is
/// written to disk while the write lock is held, so conditional writes are
/// atomic within one process. A mutation becomes visible only once its file
/// has been renamed into place. Payloads must be UTF-8.
#[derive(Clone)]
pub struct JsonFileStore {
    inner: Arc<RwLock<HashMap<String, String>>>,
    file_path: PathBuf,
}

fn io_err(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::StoreUnavailable(e.to_string())
}

impl JsonFileStore {
    /// Open the store at `path`. Creates the file with an empty map if missing.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                ServiceError::StoreUnavailable(format!("create data dir {}: {e}", parent.display()))
            })?;
        }

        let map: HashMap<String, String> = match fs::read(&file_path).await {
            Ok(bytes) if bytes.is_empty() => HashMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                ServiceError::StoreUnavailable(format!("corrupt data file {}: {e}", file_path.display()))
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let empty: HashMap<String, String> = HashMap::new();
                let staged = stage(&file_path, &empty).await?;
                commit(&staged, &file_path)?;
                empty
            }
            // 已存在但不可读：绝不能用空表覆盖
            Err(e) => {
                return Err(ServiceError::StoreUnavailable(format!(
                    "read data file {}: {e}",
                    file_path.display()
                )))
            }
        };

        Ok(Arc::new(Self { inner: Arc::new(RwLock::new(map)), file_path }))
    }

    /// Apply `f` to a copy of the map, persist the copy, then swap it in.
    ///
    /// Dropping the returned future at any await leaves both the map and the
    /// data file as they were; the rename and the swap have no await between them.
    async fn mutate<F, T>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut HashMap<String, String>) -> Option<T>,
        T: Default,
    {
        let mut map = self.inner.write().await;
        let mut next = map.clone();
        let Some(result) = f(&mut next) else { return Ok(T::default()) };
        let staged = stage(&self.file_path, &next).await?;
        commit(&staged, &self.file_path)?;
        *map = next;
        Ok(result)
    }
}

static STAGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Write `map` next to `path` without touching `path` itself.
///
/// Each call gets its own temp file: a write abandoned by a cancelled caller
/// may still be running on the blocking pool.
async fn stage(path: &Path, map: &HashMap<String, String>) -> Result<PathBuf, ServiceError> {
    let data = serde_json::to_vec(map).map_err(|e| ServiceError::Serialization(e.to_string()))?;
    let seq = STAGE_SEQ.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_extension(format!("json.{seq}.tmp"));
    fs::write(&tmp, data).await.map_err(io_err)?;
    Ok(tmp)
}

/// Publish a staged file. Synchronous so a cancelled caller cannot split it from the in-memory swap.
fn commit(staged: &Path, path: &Path) -> Result<(), ServiceError> {
    std::fs::rename(staged, path).map_err(io_err)
}

fn as_text(payload: Vec<u8>) -> Result<String, ServiceError> {
    String::from_utf8(payload).map_err(|e| ServiceError::Serialization(e.to_string()))
}

#[async_trait]
impl EntityStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, ServiceError> {
        let map = self.inner.read().await;
        Ok(map.get(key).map(|v| v.clone().into_bytes()))
    }

    async fn set(&self, key: &str, payload: Vec<u8>) -> Result<(), ServiceError> {
        let value = as_text(payload)?;
        self.mutate(|map| {
            map.insert(key.to_string(), value);
            Some(())
        })
        .await
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&[u8]>,
        payload: Vec<u8>,
    ) -> Result<CasOutcome, ServiceError> {
        let value = as_text(payload)?;
        let applied = self
            .mutate(|map| {
                let matches = match (map.get(key), expected) {
                    (Some(current), Some(expected)) => current.as_bytes() == expected,
                    (None, None) => true,
                    _ => false,
                };
                if !matches {
                    return None;
                }
                map.insert(key.to_string(), value);
                Some(true)
            })
            .await?;
        Ok(if applied { CasOutcome::Applied } else { CasOutcome::Conflict })
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ServiceError> {
        let map = self.inner.read().await;
        Ok(map.keys().filter(|k| key_matches(pattern, k)).cloned().collect())
    }
}
