//! `file_hash` computation for staged CSV uploads.

use sha2::{Digest, Sha256};

/// `SHA-256(bytes)`, hex-encoded - used to de-duplicate repeated uploads
/// of the same file before a `Batch` row is ever created.
pub fn file_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(file_hash(b"hello"), file_hash(b"hello"));
    }

    #[test]
    fn different_bytes_hash_differently() {
        assert_ne!(file_hash(b"hello"), file_hash(b"world"));
    }
}
