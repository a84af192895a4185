//! Shared helpers: cache paths, token estimation, hashing, timestamps.

pub mod hashing;
pub mod paths;
pub mod tokens;

pub use hashing::{query_cache_key, short_hash};
pub use paths::{
    cache_path, cache_root, output_dir, repo_cache_path, reviews_root, safe_repo_name,
    watch_store_dir,
};
pub use tokens::estimate_tokens;

use chrono::Utc;

/// ISO-8601 UTC timestamp used by every artifact.
pub fn utc_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// UTC date component used in session directory paths.
pub fn utc_date() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}
