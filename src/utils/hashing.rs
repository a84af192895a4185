//! Stable hashing for cache keys and run ids.

use sha2::{Digest, Sha256};

/// Full SHA-256 hex digest of a lane query key. Names API cache files.
pub fn query_cache_key(query: &str, page: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.trim().as_bytes());
    hasher.update(b"\n");
    hasher.update(page.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// First 12 hex chars of a SHA-256 digest; used for run ids.
pub fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    format!("{:x}", digest)[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_key_changes_with_page() {
        let a = query_cache_key("stars:>=50 cli", 1);
        let b = query_cache_key("stars:>=50 cli", 2);
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn short_hash_is_stable() {
        assert_eq!(short_hash("abc"), short_hash("abc"));
        assert_eq!(short_hash("abc").len(), 12);
    }
}
