//! Walk a source tree and produce its fingerprint: language counts,
//! marker files, and the current commit id.

use crate::domain::Fingerprint;
use crate::error::Result;
use crate::utils::{normalize_path, utc_timestamp};
use crate::vcs;
use ignore::WalkBuilder;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

const MAX_DEPTH: usize = 10;

/// Directories never descended into, independent of ignore files.
const DENY_DIRS: &[&str] = &[
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

/// Marker files recognized by name anywhere in the tree.
pub const MARKER_FILES: &[&str] = &[
    "SKILL.md",
    "package.json",
    "pyproject.toml",
    "Cargo.toml",
    "go.mod",
    "tsconfig.json",
    ".mcp.json",
    "mcp.json",
    "plugin.json",
    "action.yml",
    "Dockerfile",
];

/// Marker directories recognized by root-relative path.
pub const MARKER_DIRS: &[&str] =
    &[".claude", ".claude/hooks", ".claude/skills", ".claude/commands", ".github/workflows", "bin"];

static EXTENSION_LANGUAGES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("rs", "rust"),
        ("py", "python"),
        ("pyi", "python"),
        ("ts", "typescript"),
        ("tsx", "typescript"),
        ("js", "javascript"),
        ("jsx", "javascript"),
        ("mjs", "javascript"),
        ("cjs", "javascript"),
        ("go", "go"),
        ("rb", "ruby"),
        ("java", "java"),
        ("kt", "kotlin"),
        ("c", "c"),
        ("h", "c"),
        ("cc", "cpp"),
        ("cpp", "cpp"),
        ("hpp", "cpp"),
        ("cs", "csharp"),
        ("php", "php"),
        ("swift", "swift"),
        ("ex", "elixir"),
        ("exs", "elixir"),
        ("lua", "lua"),
        ("zig", "zig"),
        ("sh", "shell"),
        ("bash", "shell"),
        ("sql", "sql"),
        ("md", "markdown"),
        ("json", "json"),
        ("yml", "yaml"),
        ("yaml", "yaml"),
        ("toml", "toml"),
        ("html", "html"),
        ("css", "css"),
        ("scss", "css"),
    ])
});

/// Produce a fingerprint for `root`.
///
/// Deterministic apart from `timestamp`: identical trees yield identical
/// language counts and marker sets. Commit resolution failure yields an
/// absent commit id, never an error.
pub fn scan_tree(root: &Path) -> Result<Fingerprint> {
    let mut languages: BTreeMap<String, u64> = BTreeMap::new();
    let mut markers: BTreeSet<String> = BTreeSet::new();

    for marker_dir in MARKER_DIRS {
        if root.join(marker_dir).is_dir() {
            markers.insert((*marker_dir).to_string());
        }
    }

    let mut builder = WalkBuilder::new(root);
    builder
        .git_ignore(true)
        .git_global(false)
        .git_exclude(true)
        .hidden(false)
        .parents(false)
        .max_depth(Some(MAX_DEPTH))
        .filter_entry(|entry| {
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                if let Some(name) = entry.file_name().to_str() {
                    if DENY_DIRS.contains(&name) {
                        return false;
                    }
                    // Hidden directories are skipped except the two that
                    // carry component markers.
                    if name.starts_with('.') && name != ".github" && name != ".claude" {
                        return false;
                    }
                }
            }
            true
        });

    for entry in builder.build().flatten() {
        let path = entry.path();
        if path == root || path.is_dir() {
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if MARKER_FILES.contains(&name) {
            markers.insert(name.to_string());
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
        if let Some(language) = EXTENSION_LANGUAGES.get(ext.as_str()) {
            *languages.entry((*language).to_string()).or_insert(0) += 1;
        }
    }

    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    Ok(Fingerprint {
        commit: vcs::head_commit(&root),
        root,
        timestamp: utc_timestamp(),
        languages,
        markers: markers.into_iter().map(|m| normalize_path(&m)).collect(),
    })
}

/// Most common code language in a fingerprint; used as search-lane bias.
/// Markup and config languages never win the bias.
pub fn primary_language(fingerprint: &Fingerprint) -> Option<String> {
    const NON_CODE: &[&str] = &["markdown", "json", "yaml", "toml", "html", "css"];
    fingerprint
        .languages
        .iter()
        .filter(|(lang, _)| !NON_CODE.contains(&lang.as_str()))
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(lang, _)| lang.clone())
        .or_else(|| {
            fingerprint
                .languages
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
                .map(|(lang, _)| lang.clone())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn counts_languages_and_finds_markers() {
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path();
        fs::write(root.join("main.rs"), "fn main() {}").expect("write");
        fs::write(root.join("lib.rs"), "pub fn a() {}").expect("write");
        fs::write(root.join("helper.py"), "pass").expect("write");
        fs::write(root.join("SKILL.md"), "# skill").expect("write");
        fs::create_dir_all(root.join(".claude/hooks")).expect("mkdir");

        let fp = scan_tree(root).expect("scan");
        assert_eq!(fp.languages.get("rust"), Some(&2));
        assert_eq!(fp.languages.get("python"), Some(&1));
        assert!(fp.markers.contains(&"SKILL.md".to_string()));
        assert!(fp.markers.contains(&".claude/hooks".to_string()));
        assert!(fp.commit.is_none());
    }

    #[test]
    fn identical_trees_fingerprint_identically() {
        let make = || {
            let tmp = TempDir::new().expect("tmp");
            fs::write(tmp.path().join("a.ts"), "export {}").expect("write");
            fs::write(tmp.path().join("b.ts"), "export {}").expect("write");
            fs::write(tmp.path().join("package.json"), "{}").expect("write");
            tmp
        };
        let one = make();
        let two = make();
        let fp1 = scan_tree(one.path()).expect("scan1");
        let fp2 = scan_tree(two.path()).expect("scan2");
        assert_eq!(fp1.languages, fp2.languages);
        assert_eq!(fp1.markers, fp2.markers);
    }

    #[test]
    fn deny_listed_dirs_are_not_walked() {
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path();
        fs::create_dir_all(root.join("node_modules/pkg")).expect("mkdir");
        fs::write(root.join("node_modules/pkg/index.js"), "x").expect("write");
        fs::create_dir_all(root.join("target/debug")).expect("mkdir");
        fs::write(root.join("target/debug/out.rs"), "x").expect("write");
        fs::write(root.join("real.js"), "x").expect("write");

        let fp = scan_tree(root).expect("scan");
        assert_eq!(fp.languages.get("javascript"), Some(&1));
        assert!(fp.languages.get("rust").is_none());
    }

    #[test]
    fn marker_recorded_once_despite_multiple_hits() {
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path();
        fs::write(root.join("package.json"), "{}").expect("write");
        fs::create_dir_all(root.join("sub")).expect("mkdir");
        fs::write(root.join("sub/package.json"), "{}").expect("write");

        let fp = scan_tree(root).expect("scan");
        let hits = fp.markers.iter().filter(|m| m.as_str() == "package.json").count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn primary_language_skips_markup() {
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path();
        for i in 0..5 {
            fs::write(root.join(format!("doc{i}.md")), "# doc").expect("write");
        }
        fs::write(root.join("main.go"), "package main").expect("write");
        let fp = scan_tree(root).expect("scan");
        assert_eq!(primary_language(&fp).as_deref(), Some("go"));
    }
}
