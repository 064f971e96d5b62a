//! JSON file key-value store with write-through persistence

use crate::atomic_writer::write_atomic;
use crate::traits::{KeyValueStore, StorageError, StorageResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

/// Key-value store backed by a single JSON object on disk
///
/// The file is read once at open; every mutation rewrites it atomically
/// before returning, so a crash never leaves a half-written session.
pub struct FileStore {
    path: PathBuf,
    state: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`; a missing file is an empty store
    pub async fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();

        let state = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                StorageError::InvalidData(format!(
                    "Failed to load store {}: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Store file {} does not exist yet", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        debug!("Opened store {} ({} keys)", path.display(), state.len());

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &BTreeMap<String, String>) -> StorageResult<()> {
        let content = serde_json::to_vec_pretty(state)
            .map_err(|e| StorageError::Serialization(format!("Failed to serialize store: {}", e)))?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &content))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
    }
}

#[async_trait::async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let state = self.state.read().await;
        Ok(state.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        next.insert(key.to_string(), value);

        // Memory only changes once the file does
        self.persist(&next).await?;
        *state = next;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let mut state = self.state.write().await;
        if !state.contains_key(key) {
            return Ok(());
        }
        let mut next = state.clone();
        next.remove(key);

        self.persist(&next).await?;
        *state = next;
        Ok(())
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        let state = self.state.read().await;
        Ok(state.keys().cloned().collect())
    }
}
