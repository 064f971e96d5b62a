//! Storage trait definitions

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Durable string key-value store
///
/// Writes from independent flows are not coordinated; the last writer wins.
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a value from the store
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Set a value, replacing any previous one
    async fn set(&self, key: &str, value: String) -> StorageResult<()>;

    /// Remove a value; removing a missing key is not an error
    async fn remove(&self, key: &str) -> StorageResult<()>;

    /// List stored keys in sorted order
    async fn keys(&self) -> StorageResult<Vec<String>>;
}
