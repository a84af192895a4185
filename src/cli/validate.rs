//! `scout validate`: structural detection and modernity audit over clones.

use super::utils::{ensure_output_dir, resolve_root};
use crate::config::load_config;
use crate::domain::{read_artifact, write_artifact, CloneManifest, ValidationSummary};
use crate::utils::utc_timestamp;
use crate::validate::validate_repo;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct ValidateArgs {
    /// Source tree whose clone manifest is validated
    #[arg(short, long, value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Print the validation summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let root = resolve_root(args.path.as_deref())?;
    let out_dir = ensure_output_dir(&root)?;
    let config = load_config(&root)?;

    let manifest: CloneManifest = read_artifact(&out_dir.join("clone-manifest.json"))
        .context("no clone-manifest.json; run `scout clone` first")?;

    let mut results = Vec::new();
    for entry in &manifest.entries {
        let result = validate_repo(&entry.id, &entry.path, entry.tier1_score, &config)?;
        let per_repo = out_dir.join("validate").join(format!("{}.json", entry.id.replace('/', "_")));
        write_artifact(&per_repo, &result)?;
        if !args.json {
            println!(
                "  {}: {} kinds, modernity {:.2}, tier-2 {:.2}",
                result.id, result.structural_count, result.modernity_score, result.tier2_score
            );
        }
        results.push(result);
    }

    let summary = ValidationSummary {
        run_id: manifest.run_id.clone(),
        timestamp: utc_timestamp(),
        results,
    };
    write_artifact(&out_dir.join("validate-summary.json"), &summary)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{} repositories validated", summary.results.len());
    }
    Ok(())
}
