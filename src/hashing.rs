//! Content hashing for idempotent re-indexing
//!
//! Artifacts are diffed by SHA-256 so an unchanged file is skipped entirely
//! on re-scan; case cards are deduplicated by a truncated content hash.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hex digest of a byte buffer
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Compute the truncated (16 hex chars) content hash used as the case-card
/// idempotency key
pub fn content_hash(text: &str) -> String {
    let full = sha256_hex(text.as_bytes());
    full[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_is_deterministic() {
        let a = sha256_hex(b"__Shell Script: /home/master/bkfnds1_process.sh");
        let b = sha256_hex(b"__Shell Script: /home/master/bkfnds1_process.sh");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_content_hash_is_truncated() {
        let h = content_hash("root cause: missing insert file");
        assert_eq!(h.len(), 16);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_different_content_different_hash() {
        assert_ne!(content_hash("a"), content_hash("b"));
    }
}
