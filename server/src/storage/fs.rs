//! Filesystem object store.
//!
//! Layout: `{data_dir}/objects/{key}` holds the raw bytes and
//! `{data_dir}/objects/{key}.meta` the JSON-encoded [`ObjectMetadata`].
//! Objects are written to a temporary file and renamed into place, so a
//! concurrent reader sees either nothing or the complete object.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use axum::body::Bytes;

use super::{is_valid_key, ObjectMetadata, ObjectStore, StoreError, StoredObject};

const OBJECTS_DIR: &str = "objects";
const META_SUFFIX: &str = ".meta";
const TMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Open (and create if needed) the object directory under `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = data_dir.as_ref().join(OBJECTS_DIR);
        std::fs::create_dir_all(&root)?;
        tracing::info!("Object store at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}{}", key, META_SUFFIX))
    }
}

/// Write `data` to `path` via a sibling temp file and an atomic rename.
fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(TMP_SUFFIX);
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path).inspect_err(|_| {
        let _ = std::fs::remove_file(&tmp);
    })
}

fn read_if_exists(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    match std::fs::read(path) {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        metadata: ObjectMetadata,
    ) -> Result<(), StoreError> {
        if !is_valid_key(key) {
            return Err(StoreError::InvalidKey(key.to_string()));
        }

        let object_path = self.object_path(key);
        let meta_path = self.meta_path(key);
        let meta = serde_json::to_vec(&metadata)?;

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            // Metadata first: an object file without its sidecar still reads
            // back, just without a content type.
            write_atomic(&meta_path, &meta)?;
            write_atomic(&object_path, &bytes)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))??;

        tracing::debug!("Stored object {} under {}", key, self.root.display());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError> {
        if !is_valid_key(key) {
            return Ok(None);
        }

        let object_path = self.object_path(key);
        let meta_path = self.meta_path(key);

        tokio::task::spawn_blocking(move || -> Result<Option<StoredObject>, StoreError> {
            let Some(data) = read_if_exists(&object_path)? else {
                return Ok(None);
            };
            let metadata = match read_if_exists(&meta_path)? {
                Some(raw) => serde_json::from_slice(&raw)?,
                None => ObjectMetadata::default(),
            };
            Ok(Some(StoredObject {
                bytes: Bytes::from(data),
                metadata,
            }))
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_plain() -> ObjectMetadata {
        ObjectMetadata {
            content_type: Some("text/plain".to_string()),
        }
    }

    #[tokio::test]
    async fn test_put_then_get_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(tmp.path()).unwrap();

        store
            .put("abc-123", Bytes::from_static(b"payload"), text_plain())
            .await
            .unwrap();

        let object = store.get("abc-123").await.unwrap().expect("object exists");
        assert_eq!(&object.bytes[..], b"payload");
        assert_eq!(object.metadata, text_plain());
        assert!(store.root().join("abc-123").is_file());
        assert!(store.root().join("abc-123.meta").is_file());
        assert!(!store.root().join("abc-123.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_object_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(tmp.path()).unwrap();
        assert!(store.get("nonexistent-id").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_object_without_sidecar_has_default_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(tmp.path()).unwrap();
        std::fs::write(store.root().join("bare"), b"raw bytes").unwrap();

        let object = store.get("bare").await.unwrap().unwrap();
        assert_eq!(&object.bytes[..], b"raw bytes");
        assert_eq!(object.metadata.content_type, None);
    }

    #[tokio::test]
    async fn test_unsafe_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(tmp.path()).unwrap();
        std::fs::write(tmp.path().join("secret"), b"outside").unwrap();

        assert!(store.get("../secret").await.unwrap().is_none());
        let err = store
            .put("../escape", Bytes::new(), ObjectMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_corrupt_sidecar_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(tmp.path()).unwrap();
        std::fs::write(store.root().join("k"), b"data").unwrap();
        std::fs::write(store.root().join("k.meta"), b"{not json").unwrap();

        let err = store.get("k").await.unwrap_err();
        assert!(matches!(err, StoreError::Metadata(_)));
    }
}
