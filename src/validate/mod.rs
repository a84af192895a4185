//! Structural validation of cloned repositories.
//!
//! Detectors are closed-set rules over filesystem presence and manifest
//! contents; nothing from a cloned repository is ever executed.

pub mod modernity;

use crate::config::ScoutConfig;
use crate::domain::{MatchedTarget, TargetKind, ValidationResult};
use crate::error::Result;
use crate::rank::tier2_score;
use std::collections::BTreeSet;
use std::path::Path;

struct Detection {
    evidence: Vec<String>,
    focus_roots: Vec<String>,
    entry_candidates: Vec<String>,
}

impl Detection {
    fn new() -> Self {
        Self { evidence: Vec::new(), focus_roots: Vec::new(), entry_candidates: Vec::new() }
    }

    fn hit(&mut self, evidence: &str) {
        self.evidence.push(evidence.to_string());
    }

    fn root(&mut self, root: &str) {
        if !self.focus_roots.iter().any(|r| r == root) {
            self.focus_roots.push(root.to_string());
        }
    }

    fn entry(&mut self, path: &str) {
        if !self.entry_candidates.iter().any(|p| p == path) {
            self.entry_candidates.push(path.to_string());
        }
    }
}

fn default_focus_roots(kind: TargetKind) -> Vec<String> {
    let roots: &[&str] = match kind {
        TargetKind::McpServer | TargetKind::Cli | TargetKind::Library => &["src"],
        TargetKind::Skill => &[".claude/skills"],
        TargetKind::Hook => &[".claude/hooks"],
        TargetKind::Plugin => &["."],
    };
    roots.iter().map(|s| s.to_string()).collect()
}

fn package_json(repo: &Path) -> Option<serde_json::Value> {
    let raw = std::fs::read_to_string(repo.join("package.json")).ok()?;
    serde_json::from_str(&raw).ok()
}

fn package_dep(pkg: &serde_json::Value, needle: &str) -> bool {
    ["dependencies", "devDependencies", "peerDependencies"]
        .iter()
        .filter_map(|section| pkg.get(section).and_then(|v| v.as_object()))
        .any(|deps| deps.keys().any(|k| k.contains(needle)))
}

fn detect_kind(repo: &Path, kind: TargetKind) -> Detection {
    let mut det = Detection::new();
    let pkg = package_json(repo);
    let pyproject = std::fs::read_to_string(repo.join("pyproject.toml")).ok();
    let cargo = std::fs::read_to_string(repo.join("Cargo.toml")).ok();

    match kind {
        TargetKind::McpServer => {
            for manifest in [".mcp.json", "mcp.json", "server.json"] {
                if repo.join(manifest).is_file() {
                    det.hit(&format!("{manifest} present"));
                }
            }
            if pkg.as_ref().map(|p| package_dep(p, "modelcontextprotocol")).unwrap_or(false) {
                det.hit("MCP SDK dependency in package.json");
                det.root("src");
            }
            if pyproject.as_deref().map(|p| p.contains("mcp")).unwrap_or(false) {
                det.hit("mcp dependency in pyproject.toml");
            }
            for entry in ["src/index.ts", "src/server.ts", "server.py", "src/main.py"] {
                if repo.join(entry).is_file() {
                    det.entry(entry);
                }
            }
        }
        TargetKind::Cli => {
            if let Some(pkg) = &pkg {
                match pkg.get("bin") {
                    Some(serde_json::Value::String(path)) => {
                        det.hit("package.json bin field");
                        det.entry(path);
                    }
                    Some(serde_json::Value::Object(map)) => {
                        det.hit("package.json bin field");
                        for path in map.values().filter_map(|v| v.as_str()) {
                            det.entry(path);
                        }
                    }
                    _ => {}
                }
            }
            if pyproject.as_deref().map(|p| p.contains("[project.scripts]")).unwrap_or(false) {
                det.hit("pyproject script entry");
            }
            if cargo.as_deref().map(|c| c.contains("[[bin]]")).unwrap_or(false)
                || repo.join("src/main.rs").is_file()
            {
                det.hit("binary crate entry");
                det.entry("src/main.rs");
            }
            if repo.join("bin").is_dir() {
                det.hit("bin directory");
                det.root("bin");
            }
        }
        TargetKind::Skill => {
            if repo.join("SKILL.md").is_file() {
                det.hit("SKILL.md present");
                det.entry("SKILL.md");
            }
            if repo.join(".claude/skills").is_dir() {
                det.hit(".claude/skills directory");
                det.root(".claude/skills");
            }
        }
        TargetKind::Hook => {
            if repo.join(".claude/hooks").is_dir() {
                det.hit(".claude/hooks directory");
                det.root(".claude/hooks");
            }
            if repo.join("hooks").is_dir() {
                det.hit("hooks directory");
                det.root("hooks");
            }
        }
        TargetKind::Plugin => {
            if repo.join("plugin.json").is_file() {
                det.hit("plugin.json present");
                det.entry("plugin.json");
            }
            if let Some(pkg) = &pkg {
                let has_keyword = pkg
                    .get("keywords")
                    .and_then(|k| k.as_array())
                    .map(|arr| arr.iter().any(|v| v.as_str() == Some("plugin")))
                    .unwrap_or(false);
                if has_keyword {
                    det.hit("plugin keyword in package.json");
                }
            }
        }
        TargetKind::Library => {
            // Fallback detector: a manifest counts as library evidence.
            // validate_repo only consults it when no other kind matched,
            // so every repo with a manifest still gets at least one kind.
            if pkg.is_some() {
                det.hit("package.json manifest");
            }
            if pyproject.is_some() {
                det.hit("pyproject.toml manifest");
            }
            if cargo.is_some() {
                det.hit("Cargo.toml manifest");
            }
            if let Some(pkg) = &pkg {
                for field in ["main", "module"] {
                    if let Some(path) = pkg.get(field).and_then(|v| v.as_str()) {
                        det.entry(path);
                    }
                }
            }
            if repo.join("src/lib.rs").is_file() {
                det.entry("src/lib.rs");
            }
        }
    }
    det
}

/// Run the full detector set over a cloned repository.
pub fn validate_repo(
    id: &str,
    repo: &Path,
    tier1: f64,
    config: &ScoutConfig,
) -> Result<ValidationResult> {
    let mut matches: Vec<MatchedTarget> = Vec::new();
    let mut entry_candidates: Vec<(TargetKind, Vec<String>)> = Vec::new();

    for kind in TargetKind::ALL {
        // Library is the fallback: it only fires when nothing else did.
        if kind == TargetKind::Library && !matches.is_empty() {
            continue;
        }
        let detection = detect_kind(repo, kind);
        if detection.evidence.is_empty() {
            continue;
        }
        let focus_roots = if detection.focus_roots.is_empty() {
            default_focus_roots(kind).into_iter().filter(|r| repo.join(r).exists()).collect()
        } else {
            detection.focus_roots
        };
        matches.push(MatchedTarget { kind, evidence: detection.evidence, focus_roots });
        if !detection.entry_candidates.is_empty() {
            entry_candidates.push((kind, detection.entry_candidates));
        }
    }

    let signals = modernity::audit(repo);
    let passed = signals.iter().filter(|s| s.passed).count();
    let modernity_score = passed as f64 / signals.len() as f64;

    let distinct: BTreeSet<TargetKind> = matches.iter().map(|m| m.kind).collect();
    let structural_count = distinct.len();
    let tier2 = tier2_score(tier1, structural_count, modernity_score, config);

    Ok(ValidationResult {
        id: id.to_string(),
        path: repo.to_path_buf(),
        matches,
        modernity: signals,
        structural_count,
        modernity_score,
        tier1_score: tier1,
        tier2_score: tier2,
        entry_candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Artifact;
    use std::fs;
    use tempfile::TempDir;

    fn config() -> ScoutConfig {
        ScoutConfig::default()
    }

    #[test]
    fn mcp_server_detected_from_sdk_dependency() {
        let tmp = TempDir::new().expect("tmp");
        let repo = tmp.path();
        fs::create_dir_all(repo.join("src")).expect("mkdir");
        fs::write(
            repo.join("package.json"),
            r#"{"dependencies": {"@modelcontextprotocol/sdk": "^1.0.0"}}"#,
        )
        .expect("write");
        fs::write(repo.join("src/index.ts"), "export {}").expect("write");

        let result = validate_repo("octo/mcp", repo, 0.5, &config()).expect("validate");
        let kinds: Vec<TargetKind> = result.matches.iter().map(|m| m.kind).collect();
        assert!(kinds.contains(&TargetKind::McpServer));
        let entries = result
            .entry_candidates
            .iter()
            .find(|(k, _)| *k == TargetKind::McpServer)
            .map(|(_, e)| e.clone())
            .expect("mcp entries");
        assert!(entries.contains(&"src/index.ts".to_string()));
    }

    #[test]
    fn library_fallback_fires_with_manifest_only() {
        let tmp = TempDir::new().expect("tmp");
        let repo = tmp.path();
        fs::write(repo.join("pyproject.toml"), "[project]\nname = \"x\"\n").expect("write");

        let result = validate_repo("octo/lib", repo, 0.4, &config()).expect("validate");
        assert_eq!(result.structural_count, 1);
        assert_eq!(result.matches[0].kind, TargetKind::Library);
    }

    #[test]
    fn no_manifest_no_matches() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("notes.txt"), "just files").expect("write");

        let result = validate_repo("octo/none", tmp.path(), 0.3, &config()).expect("validate");
        assert_eq!(result.structural_count, 0);
        assert!(result.matches.is_empty());
    }

    #[test]
    fn structural_count_counts_distinct_kinds() {
        let tmp = TempDir::new().expect("tmp");
        let repo = tmp.path();
        fs::write(repo.join("package.json"), r#"{"bin": {"x": "cli.js"}, "main": "index.js"}"#)
            .expect("write");
        fs::write(repo.join("SKILL.md"), "# skill").expect("write");

        let result = validate_repo("octo/multi", repo, 0.5, &config()).expect("validate");
        assert_eq!(result.structural_count, result.matches.len());
        assert!(result.structural_count >= 2);
        assert!(result.tier2_score >= result.tier1_score);
        result.validate().expect("self-consistent artifact");
    }

    #[test]
    fn library_fallback_is_suppressed_when_another_kind_matched() {
        let tmp = TempDir::new().expect("tmp");
        let repo = tmp.path();
        // The manifest matches cli via its bin field; library must stay out.
        fs::write(repo.join("package.json"), r#"{"bin": {"x": "cli.js"}, "main": "index.js"}"#)
            .expect("write");

        let result = validate_repo("octo/clionly", repo, 0.5, &config()).expect("validate");
        let kinds: Vec<TargetKind> = result.matches.iter().map(|m| m.kind).collect();
        assert!(kinds.contains(&TargetKind::Cli));
        assert!(!kinds.contains(&TargetKind::Library));
    }
}
