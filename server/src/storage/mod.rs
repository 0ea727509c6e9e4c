//! Object storage backends.
//!
//! The gateway talks to storage only through [`ObjectStore`]: a flat
//! key-value store of binary objects with a small metadata record. Keys are
//! freshly generated identifiers, so the store never has to arbitrate
//! concurrent writes to the same key.

pub mod fs;
pub mod memory;

use async_trait::async_trait;
use axum::body::Bytes;
use serde::{Deserialize, Serialize};

pub use fs::FsObjectStore;
pub use memory::MemoryObjectStore;

/// Errors raised by a storage backend. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("object metadata is unreadable: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("invalid object key {0:?}")]
    InvalidKey(String),

    #[error("storage task failed: {0}")]
    Task(String),
}

/// Metadata kept alongside an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// MIME type declared by the uploader, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// A fully loaded object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub metadata: ObjectMetadata,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persist `bytes` under `key`, replacing nothing the caller did not create.
    async fn put(&self, key: &str, bytes: Bytes, metadata: ObjectMetadata)
        -> Result<(), StoreError>;

    /// Load the whole object stored under `key`, or `None` if there is none.
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError>;
}

/// Keys are restricted to `[A-Za-z0-9_-]` so they are safe as file names.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.len() <= 128
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
