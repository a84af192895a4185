//! `scout session` / `scout review`: build and launch review sessions.

use super::utils::{parse_csv, parse_kind};
use crate::config::load_config;
use crate::watch::lock;
use crate::watch::review::launch_review;
use crate::watch::session::{build_session, SessionRequest};
use crate::watch::store::{SessionStatus, WatchStore};
use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct SessionArgs {
    /// Repository, as owner/name
    #[arg(value_name = "REPO")]
    pub repo: String,

    /// Base commit of the review range
    #[arg(long, value_name = "COMMIT")]
    pub from: String,

    /// Head commit of the review range
    #[arg(long, value_name = "COMMIT")]
    pub to: String,

    /// Component kind under review
    #[arg(short, long, value_name = "KIND")]
    pub kind: String,

    /// Paths to scope the diff to (comma-separated)
    #[arg(long, value_name = "PATHS")]
    pub paths: Option<String>,

    /// Clone/fetch URL; defaults to the GitHub HTTPS URL for REPO
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,
}

#[derive(Args)]
pub struct ReviewArgs {
    /// Session directory to review
    #[arg(value_name = "SESSION_DIR")]
    pub session: PathBuf,

    /// Launch the reviewer now
    #[arg(long, conflicts_with = "skip")]
    pub run: bool,

    /// Mark the session skipped without reviewing
    #[arg(long, conflicts_with = "run")]
    pub skip: bool,

    /// Run the reviewer interactively instead of headless
    #[arg(long)]
    pub interactive: bool,
}

pub fn run_session(args: SessionArgs) -> Result<()> {
    super::warn_experimental("session");
    if !args.repo.contains('/') {
        bail!("repository must be owner/name, got '{}'", args.repo);
    }
    let kind = parse_kind(&args.kind)?;
    let url = args.url.clone().unwrap_or_else(|| format!("https://github.com/{}", args.repo));
    let paths = args.paths.as_deref().map(parse_csv).unwrap_or_default();

    let root = std::env::current_dir()?;
    let config = load_config(&root)?;
    let store_dir = crate::utils::watch_store_dir();
    let cache = crate::utils::cache_root();

    let session_dir = lock::with_lock(&store_dir, || {
        let mut store = WatchStore::new(&store_dir);
        let repo = store.upsert_repo(&args.repo, &url, None, None)?;

        // An existing session for this exact range is returned untouched.
        if let Some(existing) = store.find_session(repo.id, &args.from, &args.to, kind)? {
            store.close();
            return Ok(existing.path);
        }

        let request = SessionRequest {
            repo_full_name: &args.repo,
            url: &url,
            from_commit: &args.from,
            to_commit: &args.to,
            kind,
            tracked_paths: &paths,
        };
        let outcome = build_session(&request, &cache, &config)?;
        let change = store.append_change(
            repo.id,
            &args.from,
            &args.to,
            kind,
            Some(&outcome.stats),
            outcome.drift,
        )?;
        store.append_session(change.id, &outcome.session_dir)?;
        store.close();
        Ok(outcome.session_dir)
    })?;

    println!("Session ready at {}", session_dir.display());
    Ok(())
}

pub fn run_review(args: ReviewArgs) -> Result<()> {
    super::warn_experimental("review");
    let root = std::env::current_dir()?;
    let config = load_config(&root)?;
    let store_dir = crate::utils::watch_store_dir();

    let session_dir = args
        .session
        .canonicalize()
        .with_context(|| format!("session directory not found: {}", args.session.display()))?;

    let mut store = WatchStore::new(&store_dir);
    let Some(session) = store.session_by_path(&session_dir)? else {
        bail!("no session row for {}; was it created by scout?", session_dir.display());
    };

    if args.skip {
        store.transition_session(session.id, SessionStatus::Skipped, None)?;
        store.close();
        println!("Session skipped");
        return Ok(());
    }

    tracing::debug!(explicit_run = args.run, "launching reviewer");
    let outcome = launch_review(&mut store, &session, &config, args.interactive)?;
    store.close();

    match (&outcome.success, outcome.exit_code) {
        (true, _) => {
            println!("Review succeeded");
            Ok(())
        }
        (false, Some(code)) => {
            if let Some(error) = &outcome.error {
                eprintln!("{error}");
            }
            // Reviewer exit codes pass through.
            std::process::exit(code);
        }
        (false, None) => {
            bail!(outcome.error.unwrap_or_else(|| "review failed".into()))
        }
    }
}
