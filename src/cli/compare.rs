//! `scout compare`: run the whole pipeline and produce the report.

use super::utils::{ensure_output_dir, resolve_root};
use crate::config::{github_token, load_config};
use crate::discover::{build_lanes, discover, ApiCache};
use crate::domain::{read_artifact, write_artifact, CandidateSet, TargetSet, ValidationSummary};
use crate::fetch::clone_top_candidates;
use crate::infer::infer_targets;
use crate::remote::GithubClient;
use crate::render::{build_report, render_digest, render_report_markdown};
use crate::scan::{primary_language, scan_tree};
use crate::utils::utc_timestamp;
use crate::validate::validate_repo;
use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct CompareArgs {
    /// Source tree to compare against the ecosystem
    #[arg(short, long, value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Ignore cached stage artifacts and re-run every stage
    #[arg(long)]
    pub fresh: bool,

    /// Print the report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

fn stage_fresh<T: crate::domain::Artifact>(out_dir: &Path, name: &str, fresh: bool) -> Option<T> {
    if fresh {
        return None;
    }
    read_artifact(&out_dir.join(name)).ok()
}

fn progress(json_mode: bool, line: &str) {
    if !json_mode {
        println!("{line}");
    }
}

pub fn run(args: CompareArgs) -> Result<()> {
    let root = resolve_root(args.path.as_deref())?;
    let out_dir = ensure_output_dir(&root)?;
    let config = load_config(&root)?;

    // scan
    progress(args.json, "[1/6] scan");
    let fingerprint = scan_tree(&root)?;
    write_artifact(&out_dir.join("fingerprint.json"), &fingerprint)?;
    let targets: TargetSet = match stage_fresh(&out_dir, "targets.json", args.fresh) {
        Some(existing) => existing,
        None => {
            let targets = infer_targets(&root, &fingerprint)?;
            write_artifact(&out_dir.join("targets.json"), &targets)?;
            targets
        }
    };

    // discover
    progress(args.json, "[2/6] discover");
    let candidates: CandidateSet =
        match stage_fresh(&out_dir, "candidates.tier1.json", args.fresh) {
            Some(existing) => existing,
            None => {
                let language = primary_language(&fingerprint);
                let lanes = build_lanes(&targets, language.as_deref(), &config);
                let client = GithubClient::new(github_token());
                let cache =
                    ApiCache::new(crate::utils::cache_path("api"), config.api_cache_ttl_hours);
                let candidates = discover(&client, &lanes, &cache, &config)?;
                write_artifact(&out_dir.join("candidates.tier1.json"), &candidates)?;
                candidates
            }
        };

    // clone
    progress(args.json, "[3/6] clone");
    let manifest =
        clone_top_candidates(&candidates, config.clone_budget, &crate::utils::cache_path("repos"))?;
    write_artifact(&out_dir.join("clone-manifest.json"), &manifest)?;

    // validate
    progress(args.json, "[4/6] validate");
    let mut results = Vec::new();
    for entry in &manifest.entries {
        results.push(validate_repo(&entry.id, &entry.path, entry.tier1_score, &config)?);
    }
    let summary = ValidationSummary {
        run_id: candidates.run_id.clone(),
        timestamp: utc_timestamp(),
        results,
    };
    write_artifact(&out_dir.join("validate-summary.json"), &summary)?;

    // focus
    progress(args.json, "[5/6] focus");
    super::focus::run(super::focus::FocusArgs { path: Some(root.clone()), quiet: args.json })?;

    // report
    progress(args.json, "[6/6] report");
    let report = build_report(
        &summary.run_id,
        &targets,
        &summary,
        candidates.candidates.len(),
        manifest.entries.len(),
    );
    write_artifact(&out_dir.join("report.json"), &report)?;
    std::fs::write(out_dir.join("REPORT.md"), render_report_markdown(&report, &summary))?;
    let digest = render_digest(&report);
    std::fs::write(out_dir.join("DIGEST.md"), &digest)?;
    std::fs::write(
        out_dir.join("digest.json"),
        serde_json::to_string_pretty(&serde_json::json!({
            "run_id": report.run_id,
            "top_recommendation": report.pipeline.top_recommendation,
            "digest": digest,
        }))?,
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match &report.pipeline.top_recommendation {
            Some(top) => println!("Top recommendation: {} ({:.2})", top.id, top.tier2_score),
            None => println!("No candidates survived filtering."),
        }
        println!("Report written to {}", out_dir.join("REPORT.md").display());
    }
    Ok(())
}
