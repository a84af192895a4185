//! Cache and output path layout.
//!
//! Everything the pipeline persists lives either under the platform cache
//! root (clones, API responses, runs, the watch store) or under the
//! project-local `.scout/` output directory.

use std::path::{Path, PathBuf};

/// Platform cache root for repo-scout.
///
/// `SCOUT_CACHE_DIR` overrides the platform default; otherwise the user
/// cache directory (`~/.cache/repo-scout` on Linux) is used, falling back
/// to `.scout-cache` in the working directory when no cache dir resolves.
pub fn cache_root() -> PathBuf {
    if let Some(dir) = std::env::var_os("SCOUT_CACHE_DIR") {
        return PathBuf::from(dir);
    }
    dirs::cache_dir()
        .map(|base| base.join("repo-scout"))
        .unwrap_or_else(|| PathBuf::from(".scout-cache"))
}

/// A section directory under the cache root (`repos`, `api`, `runs`).
pub fn cache_path(section: &str) -> PathBuf {
    cache_root().join(section)
}

/// `<cache>/repos/<owner>/<name>`: one working copy per repository id.
pub fn repo_cache_path(owner: &str, name: &str) -> PathBuf {
    cache_path("repos").join(owner).join(name)
}

/// `<cache>/runs/reviews`: root for review session directories.
pub fn reviews_root() -> PathBuf {
    cache_path("runs").join("reviews")
}

/// `<cache>/runs/watch`: durable store directory; also houses the lock file.
pub fn watch_store_dir() -> PathBuf {
    cache_path("runs").join("watch")
}

/// Project-local output directory, `.scout/` under the source root.
pub fn output_dir(root: &Path) -> PathBuf {
    root.join(".scout")
}

/// Filesystem-safe form of `owner/name` used in session paths.
pub fn safe_repo_name(full_name: &str) -> String {
    full_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}
