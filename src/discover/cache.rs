//! TTL-bounded cache for remote search responses.
//!
//! Each (lane query, page) response is stored under the SHA-256 of its
//! query key. Stale entries are re-fetched, not served.

use crate::remote::RemoteRepoItem;
use crate::utils::{query_cache_key, utc_timestamp};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
struct CachedResponse {
    fetched_at: String,
    items: Vec<RemoteRepoItem>,
}

pub struct ApiCache {
    dir: PathBuf,
    ttl_hours: u32,
}

impl ApiCache {
    pub fn new(dir: PathBuf, ttl_hours: u32) -> Self {
        Self { dir, ttl_hours }
    }

    fn entry_path(&self, query: &str, page: u32) -> PathBuf {
        self.dir.join(format!("{}.json", query_cache_key(query, page)))
    }

    /// Fresh cached items for (query, page), or `None` on miss/stale/corrupt.
    pub fn lookup(&self, query: &str, page: u32) -> Option<Vec<RemoteRepoItem>> {
        match self.read_entry(query, page) {
            Ok(items) => Some(items),
            Err(err) => {
                tracing::debug!("api cache: {err}");
                None
            }
        }
    }

    fn read_entry(
        &self,
        query: &str,
        page: u32,
    ) -> std::result::Result<Vec<RemoteRepoItem>, crate::error::ScoutError> {
        let miss = || crate::error::ScoutError::CacheMiss {
            key: crate::utils::query_cache_key(query, page),
        };
        let raw = std::fs::read_to_string(self.entry_path(query, page)).map_err(|_| miss())?;
        let cached: CachedResponse = serde_json::from_str(&raw).map_err(|_| miss())?;
        let fetched =
            chrono::DateTime::parse_from_rfc3339(&cached.fetched_at).map_err(|_| miss())?;
        let age = chrono::Utc::now().signed_duration_since(fetched);
        if age > chrono::Duration::hours(i64::from(self.ttl_hours)) {
            return Err(miss());
        }
        Ok(cached.items)
    }

    pub fn store(&self, query: &str, page: u32, items: &[RemoteRepoItem]) {
        let entry = CachedResponse { fetched_at: utc_timestamp(), items: items.to_vec() };
        let path = self.entry_path(query, page);
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match serde_json::to_string(&entry) {
            Ok(json) => {
                if let Err(err) = std::fs::write(&path, json) {
                    tracing::warn!("failed writing api cache {}: {err}", path.display());
                }
            }
            Err(err) => tracing::warn!("failed serializing api cache entry: {err}"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
