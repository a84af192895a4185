//! Modernity audit: six cheap boolean checks over a repository tree.
//!
//! Every check is read-only. The score is passed/total.

use crate::domain::ModernitySignal;
use std::path::Path;

const MIN_NODE_MAJOR: u64 = 18;

/// Run all six checks. Order is fixed so signal lists compare stably.
pub fn audit(repo: &Path) -> Vec<ModernitySignal> {
    let pkg = read_package_json(repo);
    vec![
        check_esm(repo, pkg.as_ref()),
        check_strict_types(repo),
        check_flat_lint(repo),
        check_lockfile(repo, pkg.as_ref()),
        check_engine_target(pkg.as_ref()),
        check_test_runner(repo, pkg.as_ref()),
    ]
}

fn read_package_json(repo: &Path) -> Option<serde_json::Value> {
    let raw = std::fs::read_to_string(repo.join("package.json")).ok()?;
    serde_json::from_str(&raw).ok()
}

fn signal(name: &str, passed: bool, detail: Option<String>) -> ModernitySignal {
    ModernitySignal { name: name.to_string(), passed, detail }
}

fn check_esm(repo: &Path, pkg: Option<&serde_json::Value>) -> ModernitySignal {
    if let Some(pkg) = pkg {
        if pkg.get("type").and_then(|v| v.as_str()) == Some("module") {
            return signal("esm-modules", true, Some("package.json type=module".into()));
        }
        if pkg.get("exports").is_some() {
            return signal("esm-modules", true, Some("exports map declared".into()));
        }
    }
    if repo.join("src/index.mjs").is_file() || repo.join("index.mjs").is_file() {
        return signal("esm-modules", true, Some(".mjs entrypoint".into()));
    }
    signal("esm-modules", false, None)
}

fn check_strict_types(repo: &Path) -> ModernitySignal {
    for name in ["tsconfig.json", "tsconfig.base.json"] {
        if let Ok(raw) = std::fs::read_to_string(repo.join(name)) {
            // tsconfig allows comments; a text probe beats a strict parse.
            let compact: String = raw.split_whitespace().collect();
            if compact.contains("\"strict\":true") {
                return signal("strict-types", true, Some(format!("{name} strict=true")));
            }
        }
    }
    signal("strict-types", false, None)
}

fn check_flat_lint(repo: &Path) -> ModernitySignal {
    for name in ["eslint.config.js", "eslint.config.mjs", "eslint.config.cjs", "eslint.config.ts"]
    {
        if repo.join(name).is_file() {
            return signal("flat-lint-config", true, Some(name.into()));
        }
    }
    signal("flat-lint-config", false, None)
}

fn check_lockfile(repo: &Path, pkg: Option<&serde_json::Value>) -> ModernitySignal {
    if let Some(pkg) = pkg {
        if let Some(pm) = pkg.get("packageManager").and_then(|v| v.as_str()) {
            return signal("lockfile", true, Some(format!("packageManager {pm}")));
        }
    }
    for name in
        ["package-lock.json", "pnpm-lock.yaml", "yarn.lock", "bun.lockb", "Cargo.lock", "poetry.lock", "uv.lock"]
    {
        if repo.join(name).is_file() {
            return signal("lockfile", true, Some(name.into()));
        }
    }
    signal("lockfile", false, None)
}

fn check_engine_target(pkg: Option<&serde_json::Value>) -> ModernitySignal {
    let Some(engines) = pkg.and_then(|p| p.get("engines")).and_then(|e| e.get("node")) else {
        return signal("engine-target", false, None);
    };
    let Some(spec) = engines.as_str() else {
        return signal("engine-target", false, None);
    };
    let major = spec
        .trim_start_matches(['>', '=', '^', '~', ' '])
        .split('.')
        .next()
        .and_then(|m| m.parse::<u64>().ok());
    match major {
        Some(major) if major >= MIN_NODE_MAJOR => {
            signal("engine-target", true, Some(format!("node {spec}")))
        }
        _ => signal("engine-target", false, Some(format!("node {spec}"))),
    }
}

fn check_test_runner(repo: &Path, pkg: Option<&serde_json::Value>) -> ModernitySignal {
    if let Some(pkg) = pkg {
        for runner in ["vitest", "jest", "ava", "node:test"] {
            let in_deps = ["dependencies", "devDependencies"]
                .iter()
                .filter_map(|section| pkg.get(section).and_then(|v| v.as_object()))
                .any(|deps| deps.contains_key(runner));
            let in_scripts = pkg
                .get("scripts")
                .and_then(|s| s.as_object())
                .map(|scripts| scripts.values().any(|v| {
                    v.as_str().map(|cmd| cmd.contains(runner)).unwrap_or(false)
                }))
                .unwrap_or(false);
            if in_deps || in_scripts {
                return signal("modern-test-runner", true, Some(runner.into()));
            }
        }
    }
    for name in ["vitest.config.ts", "vitest.config.js", "jest.config.js", "jest.config.ts"] {
        if repo.join(name).is_file() {
            return signal("modern-test-runner", true, Some(name.into()));
        }
    }
    signal("modern-test-runner", false, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn all_checks_fail_on_empty_tree() {
        let tmp = TempDir::new().expect("tmp");
        let signals = audit(tmp.path());
        assert_eq!(signals.len(), 6);
        assert!(signals.iter().all(|s| !s.passed));
    }

    #[test]
    fn modern_repo_passes_all_six() {
        let tmp = TempDir::new().expect("tmp");
        let repo = tmp.path();
        fs::write(
            repo.join("package.json"),
            r#"{
                "type": "module",
                "packageManager": "pnpm@9.0.0",
                "engines": {"node": ">=20"},
                "devDependencies": {"vitest": "^2.0.0"}
            }"#,
        )
        .expect("write");
        fs::write(repo.join("tsconfig.json"), r#"{"compilerOptions": {"strict": true}}"#)
            .expect("write");
        fs::write(repo.join("eslint.config.js"), "export default []").expect("write");

        let signals = audit(repo);
        let passed = signals.iter().filter(|s| s.passed).count();
        assert_eq!(passed, 6, "signals: {signals:?}");
    }

    #[test]
    fn old_engine_target_fails() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("package.json"), r#"{"engines": {"node": ">=14"}}"#)
            .expect("write");
        let signals = audit(tmp.path());
        let engine = signals.iter().find(|s| s.name == "engine-target").expect("signal");
        assert!(!engine.passed);
        assert!(engine.detail.as_deref().unwrap_or("").contains("14"));
    }

    #[test]
    fn legacy_eslintrc_does_not_count_as_flat_config() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join(".eslintrc.json"), "{}").expect("write");
        let signals = audit(tmp.path());
        let lint = signals.iter().find(|s| s.name == "flat-lint-config").expect("signal");
        assert!(!lint.passed);
    }

    #[test]
    fn lockfile_detected_across_ecosystems() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("Cargo.lock"), "").expect("write");
        let signals = audit(tmp.path());
        let lock = signals.iter().find(|s| s.name == "lockfile").expect("signal");
        assert!(lock.passed);
    }
}
