//! Hardened git subprocess wrapper.
//!
//! Every invocation disables hook execution (`core.hooksPath=/dev/null`)
//! and terminal prompting. Callers never build a `git` command line
//! directly; they go through [`run_git`] so the hardening cannot be
//! bypassed.

use crate::error::{Result, ScoutError};
use std::path::Path;
use std::process::Command;

/// Diff statistics from `git diff --numstat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DiffStats {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
}

/// Exclusion pathspecs applied to every review diff: lockfiles, binaries,
/// build outputs, archives, and generated files never reach a reviewer.
pub const DIFF_EXCLUDE_PATHSPECS: &[&str] = &[
    ":(exclude)package-lock.json",
    ":(exclude)yarn.lock",
    ":(exclude)pnpm-lock.yaml",
    ":(exclude)Cargo.lock",
    ":(exclude)poetry.lock",
    ":(exclude)uv.lock",
    ":(exclude)go.sum",
    ":(exclude)*.min.js",
    ":(exclude)*.map",
    ":(exclude)*.png",
    ":(exclude)*.jpg",
    ":(exclude)*.jpeg",
    ":(exclude)*.gif",
    ":(exclude)*.ico",
    ":(exclude)*.pdf",
    ":(exclude)*.zip",
    ":(exclude)*.tar",
    ":(exclude)*.gz",
    ":(exclude)*.wasm",
    ":(exclude)*.so",
    ":(exclude)*.dylib",
    ":(exclude)*.dll",
    ":(exclude)dist/**",
    ":(exclude)build/**",
    ":(exclude)target/**",
    ":(exclude)node_modules/**",
    ":(exclude)__generated__/**",
    ":(exclude)*.generated.*",
];

/// Run git with hook execution disabled. Returns trimmed stdout.
pub fn run_git(args: &[&str], cwd: Option<&Path>) -> Result<String> {
    let mut cmd = Command::new("git");
    cmd.args(["-c", "core.hooksPath=/dev/null"]);
    cmd.args(args);
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    let operation = args.first().copied().unwrap_or("git").to_string();
    let output = cmd.output().map_err(|err| ScoutError::VcsFailed {
        operation: operation.clone(),
        stderr: format!("failed to spawn git: {err}"),
    })?;
    if !output.status.success() {
        return Err(ScoutError::VcsFailed {
            operation,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
}

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

/// Commit id of HEAD in a working copy, or `None` when resolution fails.
pub fn head_commit(dir: &Path) -> Option<String> {
    run_git(&["rev-parse", "HEAD"], Some(dir)).ok().filter(|id| !id.is_empty())
}

/// Resolve the remote HEAD commit without touching the local tree.
pub fn ls_remote_head(url: &str) -> Result<String> {
    let out = run_git(&["ls-remote", url, "HEAD"], None)?;
    out.split_whitespace().next().map(str::to_string).filter(|id| !id.is_empty()).ok_or_else(
        || ScoutError::VcsFailed {
            operation: "ls-remote".into(),
            stderr: format!("no HEAD ref reported by {url}"),
        },
    )
}

pub fn clone_shallow(url: &str, dest: &Path) -> Result<()> {
    let dest_str = dest.to_string_lossy();
    run_git(&["clone", "--depth", "1", "--no-tags", url, dest_str.as_ref()], None)?;
    Ok(())
}

/// Bring an existing working copy up to the remote head: fetch then hard
/// reset. History is deepened enough to diff against older snapshots.
pub fn fetch_and_reset(dir: &Path, url: &str) -> Result<String> {
    run_git(&["fetch", "--tags", "--force", url, "HEAD"], Some(dir))
        .or_else(|_| run_git(&["fetch", "--unshallow", url], Some(dir)))?;
    run_git(&["reset", "--hard", "FETCH_HEAD"], Some(dir))?;
    head_commit(dir).ok_or_else(|| ScoutError::VcsFailed {
        operation: "rev-parse".into(),
        stderr: format!("no HEAD after reset in {}", dir.display()),
    })
}

/// Deepen a shallow clone so that `commit` becomes reachable for diffing.
pub fn ensure_commit_available(dir: &Path, url: &str, commit: &str) -> Result<()> {
    if run_git(&["cat-file", "-e", &format!("{commit}^{{commit}}")], Some(dir)).is_ok() {
        return Ok(());
    }
    run_git(&["fetch", "--depth", "100", url, commit], Some(dir))
        .or_else(|_| run_git(&["fetch", "--unshallow", url], Some(dir)))?;
    run_git(&["cat-file", "-e", &format!("{commit}^{{commit}}")], Some(dir)).map(|_| ())
}

pub fn worktree_add_detached(repo_dir: &Path, worktree: &Path, commit: &str) -> Result<()> {
    let wt = worktree.to_string_lossy();
    run_git(&["worktree", "add", "--detach", wt.as_ref(), commit], Some(repo_dir))?;
    Ok(())
}

pub fn worktree_remove(repo_dir: &Path, worktree: &Path) -> Result<()> {
    let wt = worktree.to_string_lossy();
    run_git(&["worktree", "remove", "--force", wt.as_ref()], Some(repo_dir))?;
    Ok(())
}

fn diff_args(
    base: &[&str],
    from: &str,
    to: &str,
    paths: &[String],
    extra_excludes: &[String],
) -> Vec<String> {
    let mut args: Vec<String> = base.iter().map(|s| s.to_string()).collect();
    args.push(format!("{from}..{to}"));
    args.push("--".into());
    for path in paths {
        args.push(path.clone());
    }
    args.extend(DIFF_EXCLUDE_PATHSPECS.iter().map(|s| s.to_string()));
    for pattern in extra_excludes {
        let pattern = pattern.trim();
        if !pattern.is_empty() {
            args.push(format!(":(exclude){pattern}"));
        }
    }
    args
}

fn run_git_owned(args: &[String], cwd: &Path) -> Result<String> {
    let borrowed: Vec<&str> = args.iter().map(String::as_str).collect();
    run_git(&borrowed, Some(cwd))
}

/// Patch text between two commits with rename/copy detection and the
/// hygiene exclusions applied. `paths` scopes the diff when non-empty;
/// `extra_excludes` carries user-configured and per-repo ignore patterns.
pub fn diff_patch(
    repo_dir: &Path,
    from: &str,
    to: &str,
    paths: &[String],
    extra_excludes: &[String],
) -> Result<String> {
    let args = diff_args(&["diff", "-M", "-C", "--no-color"], from, to, paths, extra_excludes);
    run_git_owned(&args, repo_dir)
}

/// `git diff --numstat` over the same scope as [`diff_patch`].
pub fn diff_stats(
    repo_dir: &Path,
    from: &str,
    to: &str,
    paths: &[String],
    extra_excludes: &[String],
) -> Result<DiffStats> {
    let args = diff_args(&["diff", "--numstat", "-M", "-C"], from, to, paths, extra_excludes);
    let out = run_git_owned(&args, repo_dir)?;
    let mut stats = DiffStats::default();
    for line in out.lines() {
        let mut cols = line.split('\t');
        let added = cols.next().unwrap_or("0");
        let deleted = cols.next().unwrap_or("0");
        if cols.next().is_none() {
            continue;
        }
        stats.files_changed += 1;
        // Binary files show "-"; they count as changed with zero lines.
        stats.insertions += added.parse::<usize>().unwrap_or(0);
        stats.deletions += deleted.parse::<usize>().unwrap_or(0);
    }
    Ok(stats)
}

/// Rename-status stream (`--name-status -M -C`) used by drift detection.
/// Unscoped on purpose: drift looks for tracked paths moving elsewhere.
pub fn name_status(
    repo_dir: &Path,
    from: &str,
    to: &str,
    extra_excludes: &[String],
) -> Result<String> {
    let args = diff_args(&["diff", "--name-status", "-M", "-C"], from, to, &[], extra_excludes);
    run_git_owned(&args, repo_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    pub(crate) fn init_repo(dir: &Path) {
        let run = |args: &[&str]| {
            let status = Command::new("git")
                .args(args)
                .current_dir(dir)
                .env("GIT_TERMINAL_PROMPT", "0")
                .output()
                .expect("run git");
            assert!(status.status.success(), "git {args:?} failed");
        };
        run(&["init", "-q"]);
        run(&["config", "user.email", "scout@test.invalid"]);
        run(&["config", "user.name", "scout"]);
        run(&["config", "commit.gpgsign", "false"]);
    }

    pub(crate) fn commit_all(dir: &Path, message: &str) -> String {
        let run = |args: &[&str]| {
            let out = Command::new("git").args(args).current_dir(dir).output().expect("git");
            assert!(out.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&out.stderr));
            String::from_utf8_lossy(&out.stdout).trim().to_string()
        };
        run(&["add", "-A"]);
        run(&["commit", "-q", "-m", message]);
        run(&["rev-parse", "HEAD"])
    }

    #[test]
    fn head_commit_resolves_in_repo_and_fails_outside() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().expect("tmp");
        init_repo(tmp.path());
        std::fs::write(tmp.path().join("a.txt"), "one\n").expect("write");
        let id = commit_all(tmp.path(), "init");
        assert_eq!(head_commit(tmp.path()), Some(id));

        let empty = TempDir::new().expect("tmp2");
        assert_eq!(head_commit(empty.path()), None);
    }

    #[test]
    fn diff_excludes_lockfiles_even_when_changed() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().expect("tmp");
        init_repo(tmp.path());
        std::fs::write(tmp.path().join("code.rs"), "fn a() {}\n").expect("write");
        std::fs::write(tmp.path().join("package-lock.json"), "{}\n").expect("write");
        let from = commit_all(tmp.path(), "base");
        std::fs::write(tmp.path().join("code.rs"), "fn a() { let _ = 1; }\n").expect("write");
        std::fs::write(tmp.path().join("package-lock.json"), "{\"v\":2}\n").expect("write");
        let to = commit_all(tmp.path(), "change");

        let patch = diff_patch(tmp.path(), &from, &to, &[], &[]).expect("diff");
        assert!(patch.contains("code.rs"));
        assert!(!patch.contains("package-lock.json"));

        let stats = diff_stats(tmp.path(), &from, &to, &[], &[]).expect("stats");
        assert_eq!(stats.files_changed, 1);
    }

    #[test]
    fn extra_exclude_patterns_drop_matching_files() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().expect("tmp");
        init_repo(tmp.path());
        std::fs::write(tmp.path().join("code.rs"), "fn a() {}\n").expect("write");
        std::fs::write(tmp.path().join("schema.graphql"), "type A { id: ID }\n").expect("write");
        let from = commit_all(tmp.path(), "base");
        std::fs::write(tmp.path().join("code.rs"), "fn a() { let _ = 1; }\n").expect("write");
        std::fs::write(tmp.path().join("schema.graphql"), "type A { id: ID! }\n").expect("write");
        let to = commit_all(tmp.path(), "change");

        let excludes = vec!["*.graphql".to_string()];
        let patch = diff_patch(tmp.path(), &from, &to, &[], &excludes).expect("diff");
        assert!(patch.contains("code.rs"));
        assert!(!patch.contains("schema.graphql"));

        let stats = diff_stats(tmp.path(), &from, &to, &[], &excludes).expect("stats");
        assert_eq!(stats.files_changed, 1);
    }

    #[test]
    fn every_invocation_carries_hook_neutralization() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().expect("tmp");
        init_repo(tmp.path());
        // The -c override is visible to the spawned git itself.
        let hooks = run_git(&["config", "core.hooksPath"], Some(tmp.path())).expect("config");
        assert_eq!(hooks, "/dev/null");
    }

    #[test]
    fn numstat_parses_insertions_and_deletions() {
        if !git_available() {
            return;
        }
        let tmp = TempDir::new().expect("tmp");
        init_repo(tmp.path());
        std::fs::write(tmp.path().join("f.txt"), "a\nb\nc\n").expect("write");
        let from = commit_all(tmp.path(), "base");
        std::fs::write(tmp.path().join("f.txt"), "a\nc\nd\ne\n").expect("write");
        let to = commit_all(tmp.path(), "edit");

        let stats = diff_stats(tmp.path(), &from, &to, &[], &[]).expect("stats");
        assert_eq!(stats.files_changed, 1);
        assert!(stats.insertions >= 2);
        assert!(stats.deletions >= 1);
    }
}
