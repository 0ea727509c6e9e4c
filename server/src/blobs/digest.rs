//! SHA-256 content digests, rendered as lowercase hex.
//!
//! The same function fingerprints capability tokens and blob contents, so a
//! digest computed at upload time can be compared byte-for-byte against one
//! recomputed at download time.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Hash arbitrary input with SHA-256 and return the lowercase hex encoding.
///
/// `&str` inputs are hashed as their UTF-8 bytes, byte slices directly.
pub fn digest(input: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(input.as_ref()))
}

/// Whether `s` has the shape of a hex-encoded SHA-256 digest (either case).
pub fn is_digest_hex(s: &str) -> bool {
    s.len() == DIGEST_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Compare two hex digests in constant time over their decoded bytes.
///
/// Hex case is ignored. Anything that does not decode to exactly 32 bytes
/// never matches.
pub fn digests_match(a: &str, b: &str) -> bool {
    match (decode_digest(a), decode_digest(b)) {
        (Some(a), Some(b)) => a.ct_eq(&b).into(),
        _ => false,
    }
}

fn decode_digest(s: &str) -> Option<[u8; 32]> {
    if !is_digest_hex(s) {
        return None;
    }
    hex::decode(s).ok()?.try_into().ok()
}
