//! Content hashing for incremental indexing (C4).

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of file content, used both to detect whether a
/// discovered file changed since the last run and as the `source_hash`
/// stamped on every auto-indexed entity.
pub fn hash_content(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_hashes_identically() {
        assert_eq!(hash_content(b"fn main() {}"), hash_content(b"fn main() {}"));
    }

    #[test]
    fn different_content_hashes_differently() {
        assert_ne!(hash_content(b"a"), hash_content(b"b"));
    }
}
