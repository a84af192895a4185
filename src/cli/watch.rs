//! `scout track` / `scout watch`: the experimental tracking surface.

use super::utils::{parse_csv, parse_kind};
use crate::config::load_config;
use crate::watch::detect::{run_once, EntryAction, GitHeadResolver, RunOnceFlags};
use crate::watch::lock;
use crate::watch::store::WatchStore;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

#[derive(Args)]
pub struct TrackArgs {
    /// Repository to track, as owner/name
    #[arg(value_name = "REPO")]
    pub repo: String,

    /// Component kind to watch (mcp-server, cli, skill, hook, plugin, library)
    #[arg(short, long, value_name = "KIND")]
    pub kind: String,

    /// Paths to scope the review diff to (comma-separated)
    #[arg(long, value_name = "PATHS")]
    pub paths: Option<String>,

    /// Clone/fetch URL; defaults to the GitHub HTTPS URL for REPO
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Polling interval in hours
    #[arg(long, value_name = "HOURS", default_value_t = 24)]
    pub interval: u32,
}

#[derive(Args)]
pub struct WatchArgs {
    #[command(subcommand)]
    pub command: WatchCommands,
}

#[derive(Subcommand)]
pub enum WatchCommands {
    /// Track a repository (same as `scout track`)
    Add(TrackArgs),

    /// List tracked repositories
    List {
        /// Print as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Stop tracking a (repository, kind) pair
    Remove {
        /// Repository, as owner/name
        #[arg(value_name = "REPO")]
        repo: String,
        /// Component kind to stop tracking
        #[arg(short, long, value_name = "KIND")]
        kind: String,
    },

    /// Detect changes once and build sessions for them
    RunOnce {
        /// Only act on repositories that already have a snapshot
        #[arg(long)]
        since_last: bool,
        /// Launch the reviewer on each created session
        #[arg(long)]
        auto_review: bool,
    },

    /// Run change detection repeatedly at a fixed interval
    Daemon {
        /// Minutes between detection passes
        #[arg(long, value_name = "MINS", default_value_t = 60)]
        interval: u64,
        /// Launch the reviewer on each created session
        #[arg(long)]
        auto_review: bool,
    },

    /// List review sessions recorded in the store
    Sessions {
        /// Restrict to one repository, as owner/name
        #[arg(long, value_name = "REPO")]
        repo: Option<String>,
        /// Only sessions still pending review
        #[arg(long)]
        pending: bool,
    },

    /// Report whether the store lock is currently held
    Status,
}

pub fn run_track(args: TrackArgs) -> Result<()> {
    super::warn_experimental("track");
    add_tracked(args)
}

fn add_tracked(args: TrackArgs) -> Result<()> {
    if !args.repo.contains('/') {
        bail!("repository must be owner/name, got '{}'", args.repo);
    }
    let kind = parse_kind(&args.kind)?;
    let url = args.url.unwrap_or_else(|| format!("https://github.com/{}", args.repo));
    let paths = args.paths.as_deref().map(parse_csv).unwrap_or_default();

    let store_dir = crate::utils::watch_store_dir();
    lock::with_lock(&store_dir, || {
        let mut store = WatchStore::new(&store_dir);
        let repo = store.upsert_repo(&args.repo, &url, None, None)?;
        store.upsert_tracked(repo.id, kind, &paths, true, args.interval)?;
        store.close();
        Ok(())
    })
    .with_context(|| format!("failed tracking {}", args.repo))?;

    println!("Tracking {} ({kind}) every {}h", args.repo, args.interval);
    if !paths.is_empty() {
        println!("  scoped to: {}", paths.join(", "));
    }
    Ok(())
}

pub fn run_watch(args: WatchArgs) -> Result<()> {
    super::warn_experimental("watch");
    match args.command {
        WatchCommands::Add(args) => add_tracked(args),
        WatchCommands::List { json } => list(json),
        WatchCommands::Remove { repo, kind } => remove(&repo, &kind),
        WatchCommands::RunOnce { since_last, auto_review } => run_once_cmd(since_last, auto_review),
        WatchCommands::Daemon { interval, auto_review } => daemon(interval, auto_review),
        WatchCommands::Sessions { repo, pending } => sessions(repo.as_deref(), pending),
        WatchCommands::Status => {
            let store_dir = crate::utils::watch_store_dir();
            if lock::is_locked(&store_dir) {
                println!("watch store is locked (a run is in progress)");
            } else {
                println!("watch store is idle");
            }
            println!("store: {}", store_dir.display());
            println!("sessions: {}", crate::utils::reviews_root().display());
            Ok(())
        }
    }
}

fn list(json: bool) -> Result<()> {
    let store_dir = crate::utils::watch_store_dir();
    let mut store = WatchStore::new(&store_dir);
    let tracked = store.list_tracked()?;
    store.close();

    if json {
        let rows: Vec<serde_json::Value> = tracked
            .iter()
            .map(|entry| {
                serde_json::json!({
                    "repo": entry.repo.full_name,
                    "url": entry.repo.url,
                    "kind": entry.tracked.kind,
                    "paths": entry.tracked.paths,
                    "enabled": entry.tracked.enabled,
                    "interval_hours": entry.tracked.interval_hours,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if tracked.is_empty() {
        println!("Nothing tracked yet; use `scout track <owner/name> --kind <kind>`");
        return Ok(());
    }
    for entry in tracked {
        let state = if entry.tracked.enabled { "" } else { " (disabled)" };
        let scope = if entry.tracked.paths.is_empty() {
            String::from("whole tree")
        } else {
            entry.tracked.paths.join(", ")
        };
        let cached = entry
            .repo
            .full_name
            .split_once('/')
            .map(|(owner, name)| crate::utils::repo_cache_path(owner, name).exists())
            .unwrap_or(false);
        let fetch_state = if cached { "cached" } else { "not fetched" };
        println!(
            "{} [{}] every {}h, {fetch_state}: {scope}{state}",
            entry.repo.full_name, entry.tracked.kind, entry.tracked.interval_hours
        );
    }
    Ok(())
}

fn remove(repo: &str, kind_raw: &str) -> Result<()> {
    let kind = parse_kind(kind_raw)?;
    let store_dir = crate::utils::watch_store_dir();
    lock::with_lock(&store_dir, || {
        let mut store = WatchStore::new(&store_dir);
        let Some(row) = store.repo_by_name(repo)? else {
            return Ok(0);
        };
        let removed = store.remove_tracked(row.id, kind)?;
        store.close();
        Ok(removed)
    })
    .map(|removed| {
        if removed == 0 {
            println!("{repo} ({kind_raw}) was not tracked");
        } else {
            println!("Stopped tracking {repo} ({kind_raw})");
        }
    })
    .context("failed removing tracked entry")
}

/// Periodic driver: loops the one-shot detection at a fixed interval.
fn daemon(interval_mins: u64, auto_review: bool) -> Result<()> {
    if interval_mins == 0 {
        bail!("daemon interval must be at least 1 minute");
    }
    println!("Watching every {interval_mins}m; interrupt to stop.");
    loop {
        if let Err(err) = run_once_cmd(false, auto_review) {
            eprintln!("detection pass failed: {err:#}");
        }
        std::thread::sleep(std::time::Duration::from_secs(interval_mins * 60));
    }
}

fn sessions(repo: Option<&str>, pending: bool) -> Result<()> {
    let store_dir = crate::utils::watch_store_dir();
    let mut store = WatchStore::new(&store_dir);

    let mut ranges: std::collections::BTreeMap<i64, String> = std::collections::BTreeMap::new();
    let mut rows = if let Some(repo) = repo {
        let Some(row) = store.repo_by_name(repo)? else {
            println!("{repo} is not tracked");
            return Ok(());
        };
        for change in store.changes_for_repo(row.id)? {
            let from7: String = change.from_commit.chars().take(7).collect();
            let to7: String = change.to_commit.chars().take(7).collect();
            ranges.insert(change.id, format!("{from7}..{to7}"));
        }
        store.sessions_for_repo(row.id)?
    } else {
        store.pending_sessions()?
    };
    if pending {
        rows.retain(|s| s.status == crate::watch::store::SessionStatus::Pending);
    }
    store.close();

    if rows.is_empty() {
        println!("no sessions");
        return Ok(());
    }
    for session in rows {
        let code = session.exit_code.map(|c| format!(" (exit {c})")).unwrap_or_default();
        let range = ranges.get(&session.change_id).map(|r| format!(" {r}")).unwrap_or_default();
        println!("[{}]{}{range} {}", session.status.as_str(), code, session.path.display());
    }
    Ok(())
}

fn run_once_cmd(since_last: bool, auto_review: bool) -> Result<()> {
    let root = std::env::current_dir()?;
    let config = load_config(&root)?;
    let store_dir = crate::utils::watch_store_dir();
    let cache = crate::utils::cache_root();

    let outcomes = run_once(
        &store_dir,
        &cache,
        &GitHeadResolver,
        &config,
        RunOnceFlags { since_last, auto_review },
    )?;

    for outcome in &outcomes {
        match &outcome.action {
            EntryAction::Seeded { head } => {
                let short: String = head.chars().take(7).collect();
                println!("  {} [{}] seeded at {short}", outcome.repo, outcome.kind);
            }
            EntryAction::UpToDate { .. } => {
                println!("  {} [{}] up to date", outcome.repo, outcome.kind);
            }
            EntryAction::SessionCreated { session_dir, drift, reviewed } => {
                let mut notes = Vec::new();
                if *drift {
                    notes.push("drift");
                }
                if *reviewed {
                    notes.push("reviewed");
                }
                let suffix =
                    if notes.is_empty() { String::new() } else { format!(" [{}]", notes.join(", ")) };
                println!(
                    "  {} [{}] session at {}{suffix}",
                    outcome.repo,
                    outcome.kind,
                    session_dir.display()
                );
            }
            EntryAction::Skipped { reason } => {
                println!("  {} [{}] skipped: {reason}", outcome.repo, outcome.kind);
            }
            EntryAction::Failed { reason } => {
                println!("  {} [{}] failed: {reason}", outcome.repo, outcome.kind);
            }
        }
    }
    println!("{} tracked entries processed", outcomes.len());
    Ok(())
}
