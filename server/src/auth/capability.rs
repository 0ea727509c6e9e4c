//! Shared-secret capability check gating writes.
//!
//! The server never holds the token itself, only its SHA-256 digest. A caller
//! proves write access by presenting a token whose digest matches. Any holder
//! of the token is indistinguishable from the operator.

use crate::blobs::digest::{digest, digests_match};

/// Verifies capability tokens against a pre-shared digest.
#[derive(Debug, Clone)]
pub struct CapabilityGate {
    expected_digest: String,
}

impl CapabilityGate {
    /// Build a gate from the hex digest of the valid token.
    ///
    /// The digest is normalised to lowercase. Callers are expected to have
    /// validated its shape (see `Config::capability_digest`); a malformed
    /// digest simply never authorizes anything.
    pub fn new(expected_digest: impl Into<String>) -> Self {
        Self {
            expected_digest: expected_digest.into().to_ascii_lowercase(),
        }
    }

    /// Build a gate that accepts exactly `token`.
    pub fn for_token(token: &str) -> Self {
        Self::new(digest(token))
    }

    /// The configured digest, lowercase hex.
    pub fn expected_digest(&self) -> &str {
        &self.expected_digest
    }

    /// True only when `candidate` is non-empty and hashes to the configured digest.
    pub fn authorize(&self, candidate: &str) -> bool {
        if candidate.is_empty() {
            return false;
        }
        digests_match(&digest(candidate), &self.expected_digest)
    }
}
