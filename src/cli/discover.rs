//! `scout discover`: execute search lanes and score Tier-1 candidates.

use super::utils::{ensure_output_dir, resolve_root};
use crate::config::{github_token, load_config};
use crate::discover::{build_lanes, discover, ApiCache};
use crate::domain::{read_artifact, write_artifact, TargetSet};
use crate::remote::GithubClient;
use crate::scan::primary_language;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct DiscoverArgs {
    /// Source tree whose targets drive the search
    #[arg(short, long, value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Print the candidate set as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: DiscoverArgs) -> Result<()> {
    let root = resolve_root(args.path.as_deref())?;
    let out_dir = ensure_output_dir(&root)?;
    let config = load_config(&root)?;

    let targets: TargetSet = read_artifact(&out_dir.join("targets.json"))
        .context("no targets.json; run `scout scan` first")?;
    let fingerprint = read_artifact(&out_dir.join("fingerprint.json"))
        .context("no fingerprint.json; run `scout scan` first")?;
    let language = primary_language(&fingerprint);

    let lanes = build_lanes(&targets, language.as_deref(), &config);
    if !args.json {
        println!("Searching {} lanes...", lanes.len());
    }

    let client = GithubClient::new(github_token());
    let cache = ApiCache::new(crate::utils::cache_path("api"), config.api_cache_ttl_hours);
    let candidates = discover(&client, &lanes, &cache, &config)?;

    write_artifact(&out_dir.join("candidates.tier1.json"), &candidates)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }
    println!("Found {} candidates", candidates.candidates.len());
    for candidate in candidates.candidates.iter().take(10) {
        println!(
            "  {:.2}  {}  ({} stars, lanes: {})",
            candidate.tier1_score,
            candidate.id,
            candidate.stars,
            candidate.lanes.join("+")
        );
    }
    Ok(())
}
