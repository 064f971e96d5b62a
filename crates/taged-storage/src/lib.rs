//! Taged Storage Abstraction
//!
//! Key-value persistence used for the signed-in session:
//! - `KeyValueStore` trait
//! - In-memory store (tests, ephemeral sessions)
//! - JSON file store with atomic writes

mod atomic_writer;
pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::{KeyValueStore, StorageError, StorageResult};
