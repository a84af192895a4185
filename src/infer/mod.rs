//! Component-target inference over a fingerprint and manifest contents.
//!
//! Each detector accumulates weighted evidence; a detector that fires
//! emits a target with a two-decimal confidence and search hints. Detector
//! order never affects output ordering: targets sort by confidence
//! descending, kind name ascending.

use crate::domain::{ComponentTarget, Fingerprint, SearchHints, TargetKind, TargetSet};
use crate::error::Result;
use crate::rank::round2;
use crate::scan::primary_language;
use crate::utils::utc_timestamp;
use std::path::Path;

const MIN_CONFIDENCE: f64 = 0.2;

/// Manifest contents a detector may consult, read once up front so the
/// detectors themselves stay pure.
#[derive(Debug, Default)]
struct ManifestView {
    package_json: Option<serde_json::Value>,
    pyproject: Option<String>,
    cargo_toml: Option<String>,
}

impl ManifestView {
    fn read(root: &Path) -> Self {
        let package_json = std::fs::read_to_string(root.join("package.json"))
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok());
        let pyproject = std::fs::read_to_string(root.join("pyproject.toml")).ok();
        let cargo_toml = std::fs::read_to_string(root.join("Cargo.toml")).ok();
        Self { package_json, pyproject, cargo_toml }
    }

    fn package_dep(&self, name: &str) -> bool {
        let Some(pkg) = &self.package_json else { return false };
        ["dependencies", "devDependencies", "peerDependencies"]
            .iter()
            .filter_map(|section| pkg.get(section).and_then(|v| v.as_object()))
            .any(|deps| deps.keys().any(|k| k.contains(name)))
    }

    fn package_field(&self, name: &str) -> bool {
        self.package_json.as_ref().map(|pkg| pkg.get(name).is_some()).unwrap_or(false)
    }

    fn pyproject_contains(&self, needle: &str) -> bool {
        self.pyproject.as_deref().map(|raw| raw.contains(needle)).unwrap_or(false)
    }

    fn cargo_contains(&self, needle: &str) -> bool {
        self.cargo_toml.as_deref().map(|raw| raw.contains(needle)).unwrap_or(false)
    }

    fn any_manifest(&self) -> bool {
        self.package_json.is_some() || self.pyproject.is_some() || self.cargo_toml.is_some()
    }
}

struct Accumulator {
    kind: TargetKind,
    weight_sum: f64,
    evidence: Vec<String>,
}

impl Accumulator {
    fn new(kind: TargetKind) -> Self {
        Self { kind, weight_sum: 0.0, evidence: Vec::new() }
    }

    fn signal(&mut self, fired: bool, weight: f64, evidence: &str) {
        if fired {
            self.weight_sum += weight;
            self.evidence.push(evidence.to_string());
        }
    }

    fn into_target(self, language: Option<&str>) -> Option<ComponentTarget> {
        if self.evidence.is_empty() {
            return None;
        }
        let confidence = round2(self.weight_sum.min(1.0));
        Some(ComponentTarget {
            kind: self.kind,
            confidence,
            evidence: self.evidence,
            hints: hints_for(self.kind, language),
        })
    }
}

fn hints_for(kind: TargetKind, language: Option<&str>) -> SearchHints {
    let (keywords, topics): (&[&str], &[&str]) = match kind {
        TargetKind::McpServer => {
            (&["mcp server", "model context protocol"], &["mcp", "mcp-server"])
        }
        TargetKind::Cli => (&["cli tool", "command line"], &["cli", "command-line-tool"]),
        TargetKind::Skill => (&["claude skill", "agent skill"], &["claude", "skills"]),
        TargetKind::Hook => (&["claude hook", "agent hooks"], &["hooks", "claude-code"]),
        TargetKind::Plugin => (&["plugin", "extension"], &["plugin", "extensions"]),
        TargetKind::Library => (&["library", "sdk"], &["library", "sdk"]),
    };
    SearchHints {
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
        topics: topics.iter().map(|s| s.to_string()).collect(),
        language: language.map(str::to_string),
    }
}

fn has_marker(fingerprint: &Fingerprint, marker: &str) -> bool {
    fingerprint.markers.iter().any(|m| m == marker)
}

/// Infer ranked component targets for a fingerprinted tree.
pub fn infer_targets(root: &Path, fingerprint: &Fingerprint) -> Result<TargetSet> {
    let manifest = ManifestView::read(root);
    let language = primary_language(fingerprint);
    let lang = language.as_deref();

    let mut targets: Vec<ComponentTarget> = Vec::new();

    let mut mcp = Accumulator::new(TargetKind::McpServer);
    mcp.signal(
        has_marker(fingerprint, ".mcp.json") || has_marker(fingerprint, "mcp.json"),
        0.5,
        "mcp manifest present",
    );
    mcp.signal(manifest.package_dep("modelcontextprotocol"), 0.5, "MCP SDK dependency");
    mcp.signal(manifest.pyproject_contains("mcp"), 0.3, "mcp in pyproject");
    mcp.signal(manifest.cargo_contains("rmcp"), 0.3, "mcp crate dependency");
    targets.extend(mcp.into_target(lang));

    let mut cli = Accumulator::new(TargetKind::Cli);
    cli.signal(manifest.package_field("bin"), 0.5, "package.json bin field");
    cli.signal(manifest.pyproject_contains("[project.scripts]"), 0.5, "pyproject script entry");
    cli.signal(
        manifest.cargo_contains("[[bin]]") || root.join("src/main.rs").exists(),
        0.5,
        "binary crate entry",
    );
    cli.signal(has_marker(fingerprint, "bin"), 0.2, "bin directory");
    cli.signal(
        manifest.package_dep("commander")
            || manifest.package_dep("yargs")
            || manifest.cargo_contains("clap")
            || manifest.pyproject_contains("click"),
        0.3,
        "argument-parser dependency",
    );
    targets.extend(cli.into_target(lang));

    let mut skill = Accumulator::new(TargetKind::Skill);
    skill.signal(has_marker(fingerprint, "SKILL.md"), 0.6, "SKILL.md present");
    skill.signal(has_marker(fingerprint, ".claude/skills"), 0.4, ".claude/skills directory");
    targets.extend(skill.into_target(lang));

    let mut hook = Accumulator::new(TargetKind::Hook);
    hook.signal(has_marker(fingerprint, ".claude/hooks"), 0.6, ".claude/hooks directory");
    hook.signal(has_marker(fingerprint, ".claude/commands"), 0.2, ".claude/commands directory");
    targets.extend(hook.into_target(lang));

    let mut plugin = Accumulator::new(TargetKind::Plugin);
    plugin.signal(has_marker(fingerprint, "plugin.json"), 0.5, "plugin.json present");
    plugin.signal(
        manifest
            .package_json
            .as_ref()
            .and_then(|pkg| pkg.get("keywords"))
            .and_then(|k| k.as_array())
            .map(|arr| arr.iter().any(|v| v.as_str() == Some("plugin")))
            .unwrap_or(false),
        0.3,
        "plugin keyword in package.json",
    );
    targets.extend(plugin.into_target(lang));

    let mut library = Accumulator::new(TargetKind::Library);
    library.signal(manifest.any_manifest(), 0.2, "manifest present");
    library.signal(
        manifest.package_field("exports")
            || manifest.package_field("main")
            || root.join("src/lib.rs").exists(),
        0.2,
        "library entrypoint declared",
    );
    targets.extend(library.into_target(lang));

    targets.retain(|t| t.confidence >= MIN_CONFIDENCE);
    targets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.kind.as_str().cmp(b.kind.as_str()))
    });

    Ok(TargetSet { root: fingerprint.root.clone(), timestamp: utc_timestamp(), targets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::scan_tree;
    use std::fs;
    use tempfile::TempDir;

    fn targets_for(root: &Path) -> TargetSet {
        let fp = scan_tree(root).expect("scan");
        infer_targets(root, &fp).expect("infer")
    }

    #[test]
    fn skill_and_hook_trees_yield_both_kinds() {
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path();
        fs::write(root.join("SKILL.md"), "# skill").expect("write");
        fs::create_dir_all(root.join(".claude/hooks")).expect("mkdir");
        fs::write(root.join("run.py"), "pass").expect("write");

        let set = targets_for(root);
        let kinds: Vec<TargetKind> = set.targets.iter().map(|t| t.kind).collect();
        assert!(kinds.contains(&TargetKind::Skill));
        assert!(kinds.contains(&TargetKind::Hook));
        for target in &set.targets {
            assert!(target.confidence <= 1.0);
            let rounded = (target.confidence * 100.0).round() / 100.0;
            assert_eq!(target.confidence, rounded, "confidence must have 2 decimal places");
        }
    }

    #[test]
    fn confidence_sums_without_float_drift() {
        // 0.4 + 0.2 style sums must come out exactly, not 0.6000000000000001.
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path();
        fs::create_dir_all(root.join(".claude/hooks")).expect("mkdir");
        fs::create_dir_all(root.join(".claude/commands")).expect("mkdir");

        let set = targets_for(root);
        let hook = set.targets.iter().find(|t| t.kind == TargetKind::Hook).expect("hook target");
        assert_eq!(hook.confidence, 0.8);
    }

    #[test]
    fn confidence_caps_at_one() {
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path();
        fs::write(
            root.join("package.json"),
            r#"{"bin": {"x": "cli.js"}, "dependencies": {"commander": "^12.0.0"}}"#,
        )
        .expect("write");
        fs::write(root.join("pyproject.toml"), "[project.scripts]\nx = \"m:main\"\n")
            .expect("write");
        fs::write(root.join("Cargo.toml"), "[[bin]]\nname = \"x\"\n").expect("write");
        fs::create_dir_all(root.join("bin")).expect("mkdir");

        let set = targets_for(root);
        let cli = set.targets.iter().find(|t| t.kind == TargetKind::Cli).expect("cli target");
        assert_eq!(cli.confidence, 1.0);
    }

    #[test]
    fn low_signal_targets_fall_below_threshold() {
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path();
        // A lone pyproject gives library a 0.2 and nothing else fires.
        fs::write(root.join("pyproject.toml"), "[project]\nname = \"x\"\n").expect("write");

        let set = targets_for(root);
        assert!(set.targets.iter().all(|t| t.confidence >= 0.2));
    }

    #[test]
    fn ordering_is_confidence_descending() {
        let tmp = TempDir::new().expect("tmp");
        let root = tmp.path();
        fs::write(root.join("SKILL.md"), "# skill").expect("write");
        fs::write(root.join("package.json"), r#"{"main": "index.js"}"#).expect("write");

        let set = targets_for(root);
        for pair in set.targets.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }
}
