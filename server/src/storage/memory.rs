use async_trait::async_trait;
use axum::body::Bytes;
use dashmap::DashMap;

use super::{ObjectMetadata, ObjectStore, StoreError, StoredObject};

/// In-process object store. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, StoredObject>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Overwrite the bytes of an existing object in place, keeping its metadata.
    /// Returns false if there is no such object.
    pub fn replace_bytes(&self, key: &str, bytes: Bytes) -> bool {
        match self.objects.get_mut(key) {
            Some(mut entry) => {
                entry.bytes = bytes;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        metadata: ObjectMetadata,
    ) -> Result<(), StoreError> {
        self.objects
            .insert(key.to_string(), StoredObject { bytes, metadata });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError> {
        Ok(self.objects.get(key).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryObjectStore::new();
        let metadata = ObjectMetadata {
            content_type: Some("text/plain".to_string()),
        };
        store
            .put("k1", Bytes::from_static(b"hello"), metadata.clone())
            .await
            .unwrap();

        let object = store.get("k1").await.unwrap().expect("object stored");
        assert_eq!(object.bytes, Bytes::from_static(b"hello"));
        assert_eq!(object.metadata, metadata);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let store = MemoryObjectStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_replace_bytes_keeps_metadata() {
        let store = MemoryObjectStore::new();
        let metadata = ObjectMetadata {
            content_type: Some("image/png".to_string()),
        };
        store
            .put("k", Bytes::from_static(b"v1"), metadata.clone())
            .await
            .unwrap();

        assert!(store.replace_bytes("k", Bytes::from_static(b"v2")));
        assert!(!store.replace_bytes("other", Bytes::new()));

        let object = store.get("k").await.unwrap().unwrap();
        assert_eq!(object.bytes, Bytes::from_static(b"v2"));
        assert_eq!(object.metadata, metadata);
    }
}
