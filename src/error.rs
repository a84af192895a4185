//! Error taxonomy shared across pipeline stages and the watch subsystem.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ScoutError>;

/// Final errors a stage surfaces to its caller. Transient conditions
/// (rate limits under budget, per-repo clone failures) are absorbed where
/// they occur and never reach this enum.
#[derive(Debug, thiserror::Error)]
pub enum ScoutError {
    #[error("invalid configuration: {reason}")]
    ConfigInvalid { reason: String },

    #[error("artifact {path} failed validation: {reason}")]
    ArtifactInvalid { path: PathBuf, reason: String },

    #[error("remote API rate limit exhausted after {attempts} attempts")]
    RemoteRateLimited { attempts: u32 },

    #[error("remote API error: {message}")]
    RemoteError { message: String },

    #[error("git {operation} failed: {stderr}")]
    VcsFailed { operation: String, stderr: String },

    #[error("cache miss for {key}")]
    CacheMiss { key: String },

    #[error("watch store lock busy at {path} after {waited_ms}ms")]
    LockBusy { path: PathBuf, waited_ms: u64 },

    #[error("no changes in scope between {from} and {to}")]
    NoChangesInScope { from: String, to: String },

    #[error("session directory invalid: {reason}")]
    SessionInvalid { reason: String },

    #[error("reviewer tool '{tool}' not available")]
    ReviewerUnavailable { tool: String },

    #[error("reviewer exited with code {code}")]
    ReviewerFailed { code: i32 },

    #[error("reviewer timed out after {secs}s")]
    ReviewerTimedOut { secs: u64 },

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
