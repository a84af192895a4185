//! Clone engine: shallow-fetch top candidates into the content-addressed
//! repo cache.
//!
//! A destination that already holds a valid working copy is reused without
//! network traffic. Hook execution is disabled on every git call. One
//! failing repository never aborts the batch.

use crate::domain::{CandidateSet, CloneEntry, CloneManifest};
use crate::error::Result;
use crate::utils::utc_timestamp;
use crate::vcs;
use std::path::Path;

/// Split an `owner/name` id. Ids are validated at artifact read time, so a
/// malformed id here is a programming error upstream; it is skipped.
fn split_id(id: &str) -> Option<(&str, &str)> {
    let mut parts = id.splitn(2, '/');
    match (parts.next(), parts.next()) {
        (Some(owner), Some(name)) if !owner.is_empty() && !name.is_empty() => Some((owner, name)),
        _ => None,
    }
}

fn valid_working_copy(dest: &Path) -> Option<String> {
    if !dest.join(".git").exists() {
        return None;
    }
    vcs::head_commit(dest)
}

/// Fetch the top `budget` candidates by Tier-1 score into
/// `<repos_root>/<owner>/<name>`. Returns the manifest of repositories
/// actually present in the cache afterwards.
pub fn clone_top_candidates(
    set: &CandidateSet,
    budget: usize,
    repos_root: &Path,
) -> Result<CloneManifest> {
    let mut entries: Vec<CloneEntry> = Vec::new();

    for candidate in set.candidates.iter().take(budget) {
        let Some((owner, name)) = split_id(&candidate.id) else {
            tracing::warn!("skipping malformed candidate id '{}'", candidate.id);
            continue;
        };
        let dest = repos_root.join(owner).join(name);

        let commit = match fetch_one(&candidate.url, &dest) {
            Ok(commit) => commit,
            Err(err) => {
                tracing::warn!("clone of {} failed: {err}", candidate.id);
                continue;
            }
        };

        entries.push(CloneEntry {
            id: candidate.id.clone(),
            url: candidate.url.clone(),
            path: dest,
            commit,
            tier1_score: candidate.tier1_score,
        });
    }

    Ok(CloneManifest { run_id: set.run_id.clone(), timestamp: utc_timestamp(), entries })
}

fn fetch_one(url: &str, dest: &Path) -> Result<String> {
    if let Some(commit) = valid_working_copy(dest) {
        tracing::debug!("cache hit for {}", dest.display());
        return Ok(commit);
    }
    if dest.exists() {
        // Leftover from an interrupted clone; start clean.
        std::fs::remove_dir_all(dest)?;
    }
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    vcs::clone_shallow(url, dest)?;
    valid_working_copy(dest).ok_or_else(|| crate::error::ScoutError::VcsFailed {
        operation: "clone".into(),
        stderr: format!("no HEAD in fresh clone at {}", dest.display()),
    })
}
