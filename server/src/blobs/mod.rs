//! Blob storage gateway.
//!
//! Blobs are addressed by a random UUID assigned at upload and verified on
//! download against the SHA-256 digest the caller received at upload time.
//! Digests are never stored; each read re-hashes the current bytes.

pub mod digest;
pub mod gateway;
pub mod routes;

pub use gateway::{BlobGateway, RetrievedBlob, StoredBlob, Upload, WriteGrant};
