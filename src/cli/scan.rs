//! `scout scan`: fingerprint a tree and infer component targets.

use super::utils::{ensure_output_dir, resolve_root};
use crate::domain::write_artifact;
use crate::infer::infer_targets;
use crate::scan::scan_tree;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct ScanArgs {
    /// Source tree to fingerprint
    #[arg(short, long, value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Print the fingerprint and targets as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ScanArgs) -> Result<()> {
    let root = resolve_root(args.path.as_deref())?;
    let out_dir = ensure_output_dir(&root)?;

    let fingerprint = scan_tree(&root)?;
    write_artifact(&out_dir.join("fingerprint.json"), &fingerprint)?;

    let targets = infer_targets(&root, &fingerprint)?;
    write_artifact(&out_dir.join("targets.json"), &targets)?;

    if args.json {
        let combined = serde_json::json!({
            "fingerprint": fingerprint,
            "targets": targets,
        });
        println!("{}", serde_json::to_string_pretty(&combined)?);
        return Ok(());
    }

    let file_count: u64 = fingerprint.languages.values().sum();
    println!(
        "Scanned {} ({} classified files, {} markers)",
        root.display(),
        file_count,
        fingerprint.markers.len()
    );
    for target in &targets.targets {
        println!("  {} ({:.2}): {}", target.kind, target.confidence, target.evidence.join(", "));
    }
    if targets.targets.is_empty() {
        println!("  no component targets above the confidence threshold");
    }
    Ok(())
}
