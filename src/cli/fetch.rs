//! `scout clone`: shallow-fetch top candidates into the repo cache.

use super::utils::{ensure_output_dir, resolve_root};
use crate::config::load_config;
use crate::domain::{read_artifact, write_artifact, CandidateSet};
use crate::fetch::clone_top_candidates;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct CloneArgs {
    /// Source tree whose candidate set is cloned
    #[arg(short, long, value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Clone at most this many repositories (default from config)
    #[arg(short = 'k', long, value_name = "N")]
    pub budget: Option<usize>,
}

pub fn run(args: CloneArgs) -> Result<()> {
    let root = resolve_root(args.path.as_deref())?;
    let out_dir = ensure_output_dir(&root)?;
    let config = load_config(&root)?;

    let candidates: CandidateSet = read_artifact(&out_dir.join("candidates.tier1.json"))
        .context("no candidates.tier1.json; run `scout discover` first")?;

    let budget = args.budget.unwrap_or(config.clone_budget);
    println!("Cloning top {} of {} candidates...", budget, candidates.candidates.len());

    let manifest =
        clone_top_candidates(&candidates, budget, &crate::utils::cache_path("repos"))?;
    write_artifact(&out_dir.join("clone-manifest.json"), &manifest)?;

    for entry in &manifest.entries {
        let short: String = entry.commit.chars().take(7).collect();
        println!("  {} @ {short}", entry.id);
    }
    println!("{} repositories in cache", manifest.entries.len());
    Ok(())
}
