//! `scout focus`: emit focus bundles, provenance, and the run index.

use super::utils::{ensure_output_dir, resolve_root};
use crate::config::load_config;
use crate::domain::{read_artifact, write_artifact, CloneManifest, FocusBundle, ValidationSummary};
use crate::focus::{build_bundle, build_provenance};
use crate::render::{
    render_focus_index, render_focus_markdown, render_provenance_markdown, render_run_hints,
};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct FocusArgs {
    /// Source tree whose validation results are bundled
    #[arg(short, long, value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Suppress per-bundle progress lines (set when embedded in compare)
    #[arg(skip)]
    pub quiet: bool,
}

pub fn run(args: FocusArgs) -> Result<()> {
    let root = resolve_root(args.path.as_deref())?;
    let out_dir = ensure_output_dir(&root)?;
    let config = load_config(&root)?;

    let summary: ValidationSummary = read_artifact(&out_dir.join("validate-summary.json"))
        .context("no validate-summary.json; run `scout validate` first")?;
    let manifest: CloneManifest = read_artifact(&out_dir.join("clone-manifest.json"))
        .context("no clone-manifest.json; run `scout clone` first")?;

    let mut bundles: Vec<FocusBundle> = Vec::new();
    for result in &summary.results {
        let bundle = build_bundle(result, &config)?;
        let clone = manifest.entries.iter().find(|e| e.id == result.id);

        let repo_dir = out_dir.join("focus").join(&result.id);
        write_artifact(&repo_dir.join("FOCUS.json"), &bundle)?;
        std::fs::write(repo_dir.join("FOCUS.md"), render_focus_markdown(&bundle))?;
        std::fs::write(repo_dir.join("RUN_HINTS.md"), render_run_hints(&bundle))?;

        if let Some(clone) = clone {
            let provenance =
                build_provenance(result, &clone.url, &clone.commit, None, &summary.run_id);
            write_artifact(&repo_dir.join("PROVENANCE.json"), &provenance)?;
            std::fs::write(repo_dir.join("PROVENANCE.md"), render_provenance_markdown(&provenance))?;
        }

        if !args.quiet {
            println!(
                "  {}: {} entrypoints, {} files",
                bundle.id,
                bundle.entrypoints.len(),
                bundle.files.len()
            );
        }
        bundles.push(bundle);
    }

    let index = serde_json::json!({
        "run_id": summary.run_id,
        "bundles": bundles.iter().map(|b| serde_json::json!({
            "id": b.id,
            "entrypoints": b.entrypoints.len(),
            "files": b.files.len(),
        })).collect::<Vec<_>>(),
    });
    std::fs::write(out_dir.join("focus-index.json"), serde_json::to_string_pretty(&index)?)?;
    std::fs::write(out_dir.join("focus-index.md"), render_focus_index(&bundles))?;

    if !args.quiet {
        println!("{} focus bundles written", bundles.len());
    }
    Ok(())
}
