//! One-shot change detection over all tracked repositories.
//!
//! Runs under the store lock. A failure for one tracked entry is recorded
//! in that entry's outcome and never aborts the batch.

use crate::config::ScoutConfig;
use crate::error::Result;
use crate::vcs;
use crate::watch::review::launch_review;
use crate::watch::session::{build_session, SessionRequest};
use crate::watch::store::{TrackedJoined, WatchStore};
use crate::watch::lock;
use std::path::{Path, PathBuf};

/// Head resolution is injected so the driver can run against fixtures.
pub trait HeadResolver {
    fn fetch_head(&self, url: &str) -> Result<String>;
}

/// Production resolver: `git ls-remote <url> HEAD`.
pub struct GitHeadResolver;

impl HeadResolver for GitHeadResolver {
    fn fetch_head(&self, url: &str) -> Result<String> {
        vcs::ls_remote_head(url)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RunOnceFlags {
    /// Only act when a prior snapshot exists.
    pub since_last: bool,
    /// Launch the reviewer on each freshly created session.
    pub auto_review: bool,
}

#[derive(Debug)]
pub enum EntryAction {
    Seeded { head: String },
    UpToDate { head: String },
    SessionCreated { session_dir: PathBuf, drift: bool, reviewed: bool },
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug)]
pub struct EntryOutcome {
    pub repo: String,
    pub kind: crate::domain::TargetKind,
    pub action: EntryAction,
}

/// Process every enabled tracked entry once, under the store lock.
pub fn run_once(
    store_dir: &Path,
    cache_root: &Path,
    resolver: &dyn HeadResolver,
    config: &ScoutConfig,
    flags: RunOnceFlags,
) -> Result<Vec<EntryOutcome>> {
    lock::with_lock(store_dir, || {
        let mut store = WatchStore::new(store_dir);
        let tracked = store.list_tracked()?;
        let mut outcomes = Vec::new();

        for entry in tracked.into_iter().filter(|t| t.tracked.enabled) {
            let repo = entry.repo.full_name.clone();
            let kind = entry.tracked.kind;
            let action = process_entry(&mut store, cache_root, resolver, config, flags, &entry)
                .unwrap_or_else(|err| EntryAction::Failed { reason: err.to_string() });
            outcomes.push(EntryOutcome { repo, kind, action });
        }

        store.close();
        Ok(outcomes)
    })
}

fn process_entry(
    store: &mut WatchStore,
    cache_root: &Path,
    resolver: &dyn HeadResolver,
    config: &ScoutConfig,
    flags: RunOnceFlags,
    entry: &TrackedJoined,
) -> Result<EntryAction> {
    let repo = &entry.repo;
    let tracked = &entry.tracked;

    let latest = store.latest_snapshot(repo.id)?;
    let Some(latest) = latest else {
        if flags.since_last {
            return Ok(EntryAction::Skipped {
                reason: "no prior snapshot; nothing to compare since last".into(),
            });
        }
        // Seeding: record the current head; no change, no session.
        let head = resolver.fetch_head(&repo.url)?;
        store.append_snapshot(repo.id, &head)?;
        return Ok(EntryAction::Seeded { head });
    };

    let head = resolver.fetch_head(&repo.url)?;
    if head == latest.commit {
        return Ok(EntryAction::UpToDate { head });
    }

    // Idempotence: an existing session for this exact transition is reused.
    if let Some(existing) = store.find_session(repo.id, &latest.commit, &head, tracked.kind)? {
        if store.latest_snapshot(repo.id)?.map(|s| s.commit) != Some(head.clone()) {
            store.append_snapshot(repo.id, &head)?;
        }
        return Ok(EntryAction::SessionCreated {
            session_dir: existing.path,
            drift: false,
            reviewed: false,
        });
    }

    let request = SessionRequest {
        repo_full_name: &repo.full_name,
        url: &repo.url,
        from_commit: &latest.commit,
        to_commit: &head,
        kind: tracked.kind,
        tracked_paths: &tracked.paths,
    };
    let outcome = build_session(&request, cache_root, config)?;

    let change = store.append_change(
        repo.id,
        &latest.commit,
        &head,
        tracked.kind,
        Some(&outcome.stats),
        outcome.drift,
    )?;
    let session = store.append_session(change.id, &outcome.session_dir)?;
    store.append_snapshot(repo.id, &head)?;

    let mut reviewed = false;
    if flags.auto_review {
        match launch_review(store, &session, config, false) {
            Ok(result) => reviewed = result.success,
            Err(err) => tracing::warn!("auto-review of {} failed: {err}", repo.full_name),
        }
    }

    Ok(EntryAction::SessionCreated { session_dir: outcome.session_dir, drift: outcome.drift, reviewed })
}
