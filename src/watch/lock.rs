//! Cross-process advisory lock over the watch store directory.
//!
//! Acquisition retries with bounded exponential backoff; the guard
//! releases on drop so every exit path, including panics, unlocks. A
//! stale lock file older than the threshold is reclaimed.

use crate::error::{Result, ScoutError};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

const LOCK_FILE: &str = "scout.lock";
const MAX_ATTEMPTS: u32 = 8;
const INITIAL_BACKOFF_MS: u64 = 50;
const MAX_BACKOFF_MS: u64 = 2000;

pub const STALE_THRESHOLD: Duration = Duration::from_secs(30);

/// Held lock. Dropping unlocks; the file itself stays behind as a marker
/// refreshed on the next acquisition.
pub struct WatchLock {
    file: File,
    path: PathBuf,
}

impl WatchLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WatchLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

fn lock_path(dir: &Path) -> PathBuf {
    dir.join(LOCK_FILE)
}

/// Acquire the lock for a store directory, retrying with bounded backoff.
pub fn acquire(dir: &Path) -> Result<WatchLock> {
    std::fs::create_dir_all(dir)?;
    let path = lock_path(dir);
    let started = Instant::now();
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    for attempt in 1..=MAX_ATTEMPTS {
        let file = OpenOptions::new().create(true).read(true).write(true).truncate(false).open(&path)?;
        match file.try_lock_exclusive() {
            Ok(()) => {
                // Refresh mtime so observers can age the lock.
                let _ = file.set_len(0);
                use std::io::Write as _;
                let mut file = file;
                let _ = writeln!(file, "{}", std::process::id());
                return Ok(WatchLock { file, path });
            }
            Err(_) if attempt < MAX_ATTEMPTS => {
                if is_stale(&path) {
                    tracing::warn!("reclaiming stale lock {}", path.display());
                    let _ = std::fs::remove_file(&path);
                    continue;
                }
                std::thread::sleep(Duration::from_millis(backoff_ms));
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
            Err(_) => break,
        }
    }

    Err(ScoutError::LockBusy { path, waited_ms: started.elapsed().as_millis() as u64 })
}

fn is_stale(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else { return false };
    let Ok(mtime) = meta.modified() else { return false };
    SystemTime::now().duration_since(mtime).map(|age| age > STALE_THRESHOLD).unwrap_or(false)
}

/// Non-destructively observe whether the lock is currently held.
pub fn is_locked(dir: &Path) -> bool {
    let path = lock_path(dir);
    let Ok(file) = OpenOptions::new().read(true).write(true).open(&path) else {
        return false;
    };
    match file.try_lock_shared() {
        Ok(()) => {
            let _ = fs2::FileExt::unlock(&file);
            false
        }
        Err(_) => true,
    }
}

/// Run `f` while holding the lock. The lock releases on every exit path:
/// normal return, error, or panic (guard drop runs during unwind).
pub fn with_lock<T>(dir: &Path, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let _guard = acquire(dir)?;
    f()
}
