//! Focus bundling: entrypoints, minimal scope roots, and a depth-budgeted
//! file selection per validated repository.

use crate::config::ScoutConfig;
use crate::domain::{
    FocusBundle, FocusEntrypoint, FocusFile, Provenance, TargetKind, ValidationResult,
};
use crate::error::Result;
use crate::utils::{normalize_path, utc_timestamp};
use std::collections::BTreeSet;
use std::path::Path;

const MAX_WALK_DEPTH: usize = 5;

const WALK_DENY_DIRS: &[&str] = &[
    "node_modules",
    "__pycache__",
    ".git",
    ".venv",
    "venv",
    "target",
    "dist",
    "build",
    ".next",
    ".cache",
    "coverage",
    "vendor",
];

const INCLUDE_EXTENSIONS: &[&str] = &[
    "rs", "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "go", "rb", "md", "json", "toml", "yml",
    "yaml", "sh",
];

fn conventional_entrypoints(kind: TargetKind) -> &'static [&'static str] {
    match kind {
        TargetKind::McpServer => &["src/index.ts", "src/server.ts", "server.py", "src/main.py"],
        TargetKind::Cli => &["src/cli.ts", "src/main.rs", "cli.py", "bin/cli.js", "src/index.ts"],
        TargetKind::Skill => &["SKILL.md"],
        TargetKind::Hook => &[".claude/hooks/settings.json", "hooks/README.md"],
        TargetKind::Plugin => &["plugin.json", "src/index.ts"],
        TargetKind::Library => &["src/lib.rs", "src/index.ts", "index.js", "lib/index.js"],
    }
}

/// Build the focus bundle for one validation result.
pub fn build_bundle(result: &ValidationResult, config: &ScoutConfig) -> Result<FocusBundle> {
    let repo = result.path.as_path();
    let mut entrypoints: Vec<FocusEntrypoint> = Vec::new();
    let mut seen_paths: BTreeSet<String> = BTreeSet::new();

    for matched in &result.matches {
        let mut kind_count = 0usize;

        // (a) candidate paths surfaced by validation, when they exist.
        let candidates = result
            .entry_candidates
            .iter()
            .find(|(kind, _)| *kind == matched.kind)
            .map(|(_, paths)| paths.as_slice())
            .unwrap_or(&[]);
        for path in candidates {
            if kind_count >= config.max_entrypoints_per_kind {
                break;
            }
            if repo.join(path).is_file() && seen_paths.insert(path.clone()) {
                entrypoints.push(FocusEntrypoint {
                    kind: matched.kind,
                    path: normalize_path(path),
                    reason: "declared entrypoint".into(),
                });
                kind_count += 1;
            }
        }

        // (b) conventional per-kind locations.
        for path in conventional_entrypoints(matched.kind) {
            if kind_count >= config.max_entrypoints_per_kind {
                break;
            }
            if repo.join(path).is_file() && seen_paths.insert((*path).to_string()) {
                entrypoints.push(FocusEntrypoint {
                    kind: matched.kind,
                    path: normalize_path(path),
                    reason: "conventional location".into(),
                });
                kind_count += 1;
            }
        }
    }

    // (c) README as a library entrypoint when nothing claimed it yet.
    let has_library = result.matches.iter().any(|m| m.kind == TargetKind::Library);
    if has_library {
        for readme in ["README.md", "README.rst", "readme.md"] {
            if repo.join(readme).is_file() && seen_paths.insert(readme.to_string()) {
                entrypoints.push(FocusEntrypoint {
                    kind: TargetKind::Library,
                    path: readme.to_string(),
                    reason: "readme fallback".into(),
                });
                break;
            }
        }
    }

    let scope_roots = minimal_scope_roots(result);
    let files = depth_budget_walk(repo, &scope_roots, config);

    Ok(FocusBundle { id: result.id.clone(), entrypoints, scope_roots, files })
}

/// Deduplicate scope roots: a root nested under another is dropped.
fn minimal_scope_roots(result: &ValidationResult) -> Vec<String> {
    let mut roots: Vec<String> = Vec::new();
    for matched in &result.matches {
        for root in &matched.focus_roots {
            let root = normalize_path(root.trim_end_matches('/'));
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
    }
    if roots.iter().any(|r| r == ".") {
        return vec![".".into()];
    }
    let keep: Vec<String> = roots
        .iter()
        .filter(|root| {
            !roots.iter().any(|other| *root != other && root.starts_with(&format!("{other}/")))
        })
        .cloned()
        .collect();
    keep
}

/// Walk each scope root to bounded depth collecting included files, sorted
/// ascending by size. `max_dirs_per_target` is one budget for the whole
/// target, shared across its scope roots.
fn depth_budget_walk(repo: &Path, scope_roots: &[String], config: &ScoutConfig) -> Vec<FocusFile> {
    let mut files: Vec<FocusFile> = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut dirs_visited = 0usize;

    for root in scope_roots {
        let start = if root == "." { repo.to_path_buf() } else { repo.join(root) };
        if !start.is_dir() {
            continue;
        }
        walk_dir(
            repo,
            &start,
            0,
            &mut dirs_visited,
            config,
            &mut files,
            &mut seen,
        );
    }

    files.sort_by(|a, b| a.size_bytes.cmp(&b.size_bytes).then_with(|| a.path.cmp(&b.path)));
    files
}

fn walk_dir(
    repo: &Path,
    dir: &Path,
    depth: usize,
    dirs_visited: &mut usize,
    config: &ScoutConfig,
    files: &mut Vec<FocusFile>,
    seen: &mut BTreeSet<String>,
) {
    if depth > MAX_WALK_DEPTH || *dirs_visited >= config.max_dirs_per_target {
        return;
    }
    *dirs_visited += 1;

    let Ok(entries) = std::fs::read_dir(dir) else { return };
    let mut names: Vec<std::fs::DirEntry> = entries.flatten().collect();
    names.sort_by_key(|e| e.file_name());

    let mut files_in_dir = 0usize;
    let mut subdirs: Vec<std::path::PathBuf> = Vec::new();

    for entry in names {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if path.is_dir() {
            if !WALK_DENY_DIRS.contains(&name.as_str()) && !name.starts_with('.') {
                subdirs.push(path);
            }
            continue;
        }
        if files_in_dir >= config.max_files_per_dir {
            continue;
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
        if !INCLUDE_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }
        let Ok(rel) = path.strip_prefix(repo) else { continue };
        let rel = normalize_path(&rel.to_string_lossy());
        let Ok(meta) = path.metadata() else { continue };
        if seen.insert(rel.clone()) {
            files.push(FocusFile { path: rel, size_bytes: meta.len() });
            files_in_dir += 1;
        }
    }

    for subdir in subdirs {
        walk_dir(repo, &subdir, depth + 1, dirs_visited, config, files, seen);
    }
}

/// Immutable provenance record emitted next to every bundle.
pub fn build_provenance(
    result: &ValidationResult,
    url: &str,
    commit: &str,
    license: Option<String>,
    run_id: &str,
) -> Provenance {
    Provenance {
        id: result.id.clone(),
        url: url.to_string(),
        commit: commit.to_string(),
        license,
        tier1_score: result.tier1_score,
        tier2_score: result.tier2_score,
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        run_id: run_id.to_string(),
        timestamp: utc_timestamp(),
    }
}
