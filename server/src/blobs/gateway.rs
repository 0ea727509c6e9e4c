//! Blob store gateway: capability-gated writes and integrity-verified reads.
//!
//! Writes assign a fresh random identifier, persist the bytes and hand back
//! the identifier together with the SHA-256 of what was received. Reads
//! re-fetch the whole object, re-hash it and only release the bytes when the
//! caller's digest matches, which catches corruption in transit and at rest.

use std::sync::Arc;

use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::capability::CapabilityGate;
use crate::blobs::digest::{digest, digests_match};
use crate::error::GatewayError;
use crate::storage::{ObjectMetadata, ObjectStore};

/// Content type returned when the object carries none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Bytes,
    /// MIME type declared by the client for the file part.
    pub content_type: Option<String>,
}

impl Upload {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Durable reference returned by a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlob {
    pub uuid: String,
    pub hash: String,
}

#[derive(Debug, Clone)]
pub struct RetrievedBlob {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Proof that a write passed the capability gate.
///
/// Only [`BlobGateway::authorize_write`] can produce one, so nothing can be
/// persisted without a successful check.
#[derive(Debug)]
pub struct WriteGrant {
    _private: (),
}

pub struct BlobGateway {
    gate: CapabilityGate,
    store: Arc<dyn ObjectStore>,
}

impl BlobGateway {
    pub fn new(gate: CapabilityGate, store: Arc<dyn ObjectStore>) -> Self {
        Self { gate, store }
    }

    /// Check the capability token for a write.
    pub fn authorize_write(&self, token: Option<&str>) -> Result<WriteGrant, GatewayError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(GatewayError::MissingCredential)?;

        if !self.gate.authorize(token) {
            tracing::warn!("Rejected write with invalid capability token");
            return Err(GatewayError::Unauthorized);
        }

        Ok(WriteGrant { _private: () })
    }

    /// Persist an upload under a fresh identifier.
    pub async fn persist(
        &self,
        _grant: WriteGrant,
        upload: Option<Upload>,
    ) -> Result<StoredBlob, GatewayError> {
        let upload = upload.ok_or(GatewayError::InvalidPayload)?;

        let id = Uuid::new_v4().to_string();
        let size = upload.bytes.len();
        let metadata = ObjectMetadata {
            content_type: upload.content_type,
        };

        self.store.put(&id, upload.bytes.clone(), metadata).await?;
        let hash = digest(&upload.bytes);

        tracing::info!("Stored blob {} ({} bytes, sha256 {})", id, size, hash);

        Ok(StoredBlob { uuid: id, hash })
    }

    /// Authorize and persist in one step.
    pub async fn store(
        &self,
        token: Option<&str>,
        upload: Option<Upload>,
    ) -> Result<StoredBlob, GatewayError> {
        let grant = self.authorize_write(token)?;
        self.persist(grant, upload).await
    }

    /// Fetch a blob and release it only if its current content matches
    /// `expected_digest`.
    pub async fn retrieve(
        &self,
        id: Option<&str>,
        expected_digest: Option<&str>,
    ) -> Result<RetrievedBlob, GatewayError> {
        let (id, expected_digest) = match (id, expected_digest) {
            (Some(id), Some(hash)) if !id.is_empty() && !hash.is_empty() => (id, hash),
            _ => return Err(GatewayError::MissingParameters),
        };

        let object = self
            .store
            .get(id)
            .await?
            .ok_or(GatewayError::NotFound)?;

        let computed = digest(&object.bytes);
        if !digests_match(&computed, expected_digest) {
            tracing::warn!(
                "Integrity check failed for blob {}: computed {}, expected {}",
                id,
                computed,
                expected_digest
            );
            return Err(GatewayError::IntegrityMismatch);
        }

        tracing::debug!("Serving blob {} ({} bytes)", id, object.bytes.len());

        Ok(RetrievedBlob {
            bytes: object.bytes,
            content_type: object
                .metadata
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        })
    }
}
