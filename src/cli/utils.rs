//! Shared helpers for CLI commands.

use crate::domain::TargetKind;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Resolve and canonicalize the project root argument.
pub fn resolve_root(path: Option<&Path>) -> Result<PathBuf> {
    let root = path.unwrap_or_else(|| Path::new("."));
    root.canonicalize().with_context(|| format!("path does not exist: {}", root.display()))
}

/// `.scout/` output directory under the project root, created on demand.
pub fn ensure_output_dir(root: &Path) -> Result<PathBuf> {
    let dir = crate::utils::output_dir(root);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed creating output dir {}", dir.display()))?;
    Ok(dir)
}

pub fn parse_kind(raw: &str) -> Result<TargetKind> {
    TargetKind::from_str(raw).map_err(|reason| anyhow::anyhow!(reason))
}

/// Comma-separated list → trimmed entries, empties dropped.
pub fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}
