//! Review-session construction.
//!
//! A session is an on-disk directory packaging a detached working tree,
//! the hygienic diff (whole or chunked), machine context, and reviewer
//! instructions. Creation is best-effort-atomic: any failure after
//! worktree creation tears the partial session down.

use crate::config::ScoutConfig;
use crate::domain::{Artifact, TargetKind};
use crate::error::{Result, ScoutError};
use crate::utils::{estimate_tokens, safe_repo_name, utc_date, utc_timestamp};
use crate::vcs::{self, DiffStats};
use crate::watch::chunker::{chunk_diff, DiffChunk};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Inputs for one session build.
#[derive(Debug)]
pub struct SessionRequest<'a> {
    pub repo_full_name: &'a str,
    pub url: &'a str,
    pub from_commit: &'a str,
    pub to_commit: &'a str,
    pub kind: TargetKind,
    pub tracked_paths: &'a [String],
}

#[derive(Debug)]
pub struct SessionOutcome {
    pub session_dir: PathBuf,
    pub drift: bool,
    pub stats: DiffStats,
    pub chunk_count: usize,
    pub estimated_tokens: usize,
}

/// Machine-readable session context (`review_context.json`).
#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewContext {
    pub repo: String,
    pub url: String,
    pub from_commit: String,
    pub to_commit: String,
    pub kind: TargetKind,
    pub tracked_paths: Vec<String>,
    pub drift: bool,
    pub chunk_count: usize,
    pub estimated_tokens: usize,
    pub reviewer_skill: String,
    pub created_at: String,
}

impl Artifact for ReviewContext {
    const NAME: &'static str = "review_context";

    fn validate(&self) -> std::result::Result<(), String> {
        if self.repo.is_empty() || self.from_commit.is_empty() || self.to_commit.is_empty() {
            return Err("repo and commit pair must be non-empty".into());
        }
        if self.chunk_count == 0 {
            return Err("a session always has at least one chunk".into());
        }
        crate::domain::check_timestamp("created_at", &self.created_at)
    }
}

/// Deterministic session directory for a commit pair.
pub fn session_dir_for(
    cache_root: &Path,
    repo_full_name: &str,
    kind: TargetKind,
    from_commit: &str,
    to_commit: &str,
) -> PathBuf {
    let from7: String = from_commit.chars().take(7).collect();
    let to7: String = to_commit.chars().take(7).collect();
    cache_root
        .join("runs")
        .join("reviews")
        .join(safe_repo_name(repo_full_name))
        .join(utc_date())
        .join(kind.as_str())
        .join(format!("{from7}_{to7}"))
}

/// Build a session directory for a commit range.
///
/// Fails with `NoChangesInScope` when nothing relevant changed; in that
/// case no session directory is left behind.
pub fn build_session(
    request: &SessionRequest<'_>,
    cache_root: &Path,
    config: &ScoutConfig,
) -> Result<SessionOutcome> {
    let repo_dir = materialize_repo(request, cache_root)?;
    vcs::ensure_commit_available(&repo_dir, request.url, request.from_commit)?;
    vcs::ensure_commit_available(&repo_dir, request.url, request.to_commit)?;

    let session_dir = session_dir_for(
        cache_root,
        request.repo_full_name,
        request.kind,
        request.from_commit,
        request.to_commit,
    );
    std::fs::create_dir_all(&session_dir)?;

    let worktree = session_dir.join("repo");
    vcs::worktree_add_detached(&repo_dir, &worktree, request.to_commit)?;

    match populate_session(request, &repo_dir, &session_dir, config) {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            teardown(&repo_dir, &session_dir);
            Err(err)
        }
    }
}

fn materialize_repo(request: &SessionRequest<'_>, cache_root: &Path) -> Result<PathBuf> {
    let mut parts = request.repo_full_name.splitn(2, '/');
    let owner = parts.next().unwrap_or("_");
    let name = parts.next().unwrap_or(request.repo_full_name);
    let repo_dir = cache_root.join("repos").join(owner).join(name);

    if !repo_dir.join(".git").exists() {
        if repo_dir.exists() {
            std::fs::remove_dir_all(&repo_dir)?;
        }
        if let Some(parent) = repo_dir.parent() {
            std::fs::create_dir_all(parent)?;
        }
        vcs::clone_shallow(request.url, &repo_dir)?;
    } else {
        vcs::fetch_and_reset(&repo_dir, request.url)?;
    }
    Ok(repo_dir)
}

/// Ignore patterns from the repository's own `.scoutignore`, one pathspec
/// pattern per line, `#` starting a comment line.
fn repo_ignore_patterns(repo_dir: &Path) -> Vec<String> {
    let Ok(raw) = std::fs::read_to_string(repo_dir.join(".scoutignore")) else {
        return Vec::new();
    };
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

fn populate_session(
    request: &SessionRequest<'_>,
    repo_dir: &Path,
    session_dir: &Path,
    config: &ScoutConfig,
) -> Result<SessionOutcome> {
    // Hygiene exclusions: the built-in set (applied inside vcs) merged
    // with user-configured patterns and the repo's own ignore file.
    let mut excludes = config.review_ignore_patterns.clone();
    excludes.extend(repo_ignore_patterns(repo_dir));

    let scoped = vcs::diff_patch(
        repo_dir,
        request.from_commit,
        request.to_commit,
        request.tracked_paths,
        &excludes,
    )?;
    let unscoped = if request.tracked_paths.is_empty() {
        scoped.clone()
    } else {
        vcs::diff_patch(repo_dir, request.from_commit, request.to_commit, &[], &excludes)?
    };

    // Scoped-drift rule: an empty scoped diff over a non-empty range means
    // the tracked paths moved; adopt the unscoped diff and record drift.
    let (diff, drift, drift_summary) = if scoped.trim().is_empty() && !unscoped.trim().is_empty() {
        let summary = format!(
            "Tracked paths ({}) produced no diff between {} and {}, but the \
             repository changed elsewhere. The unscoped diff was adopted; the \
             tracked paths likely moved or were renamed.\n",
            request.tracked_paths.join(", "),
            request.from_commit,
            request.to_commit
        );
        (unscoped.clone(), true, Some(summary))
    } else {
        let renames = detect_renames(repo_dir, request, &excludes)?;
        if renames.is_empty() {
            (scoped.clone(), false, None)
        } else {
            let mut summary = String::from("Tracked paths changed identity in this range:\n\n");
            for (old, new) in &renames {
                let _ = writeln!(summary, "- `{old}` -> `{new}`");
            }
            (scoped.clone(), true, Some(summary))
        }
    };

    if diff.trim().is_empty() {
        return Err(ScoutError::NoChangesInScope {
            from: request.from_commit.to_string(),
            to: request.to_commit.to_string(),
        });
    }

    let stats_paths = if drift && scoped.trim().is_empty() {
        Vec::new()
    } else {
        request.tracked_paths.to_vec()
    };
    let stats = vcs::diff_stats(
        repo_dir,
        request.from_commit,
        request.to_commit,
        &stats_paths,
        &excludes,
    )?;

    let chunks = chunk_diff(&diff, config.review_max_tokens, config.review_max_files_per_chunk);
    let estimated_tokens = estimate_tokens(&diff);

    write_diff_files(session_dir, &diff, &chunks)?;

    let context = ReviewContext {
        repo: request.repo_full_name.to_string(),
        url: request.url.to_string(),
        from_commit: request.from_commit.to_string(),
        to_commit: request.to_commit.to_string(),
        kind: request.kind,
        tracked_paths: request.tracked_paths.to_vec(),
        drift,
        chunk_count: chunks.len(),
        estimated_tokens,
        reviewer_skill: config.reviewer_skill.clone(),
        created_at: utc_timestamp(),
    };
    crate::domain::write_artifact(&session_dir.join("review_context.json"), &context)?;

    std::fs::write(
        session_dir.join("REVIEW_INSTRUCTIONS.md"),
        render_instructions(&context),
    )?;
    if let Some(summary) = drift_summary {
        std::fs::write(session_dir.join("DRIFT.md"), format!("# Drift\n\n{summary}"))?;
    }
    std::fs::create_dir_all(session_dir.join("OUTPUT"))?;

    Ok(SessionOutcome {
        session_dir: session_dir.to_path_buf(),
        drift,
        stats,
        chunk_count: chunks.len(),
        estimated_tokens,
    })
}

/// Rename/copy entries from the rename-status stream that move a tracked
/// path out of scope (or into it).
fn detect_renames(
    repo_dir: &Path,
    request: &SessionRequest<'_>,
    excludes: &[String],
) -> Result<Vec<(String, String)>> {
    if request.tracked_paths.is_empty() {
        return Ok(Vec::new());
    }
    let stream =
        vcs::name_status(repo_dir, request.from_commit, request.to_commit, excludes)?;
    let in_scope = |path: &str| {
        request
            .tracked_paths
            .iter()
            .any(|root| path == root || path.starts_with(&format!("{}/", root.trim_end_matches('/'))))
    };

    let mut renames = Vec::new();
    for line in stream.lines() {
        let mut cols = line.split('\t');
        let Some(status) = cols.next() else { continue };
        if !status.starts_with('R') && !status.starts_with('C') {
            continue;
        }
        let (Some(old), Some(new)) = (cols.next(), cols.next()) else { continue };
        if in_scope(old) != in_scope(new) {
            renames.push((old.to_string(), new.to_string()));
        }
    }
    Ok(renames)
}

fn write_diff_files(session_dir: &Path, diff: &str, chunks: &[DiffChunk]) -> Result<()> {
    if chunks.len() <= 1 {
        std::fs::write(session_dir.join("diff.patch"), diff)?;
        return Ok(());
    }
    let chunks_dir = session_dir.join("chunks");
    std::fs::create_dir_all(&chunks_dir)?;

    let mut index = String::from("# Chunk index\n\n");
    for chunk in chunks {
        let name = format!("diff.{:03}.patch", chunk.index);
        std::fs::write(chunks_dir.join(&name), chunk.content())?;
        let _ = writeln!(
            index,
            "## chunks/{name} ({} of {}, ~{} tokens)",
            chunk.index,
            chunks.len(),
            chunk.estimated_tokens
        );
        for file in &chunk.files {
            let _ = writeln!(index, "- `{}`", file.path);
        }
        index.push('\n');
    }
    std::fs::write(session_dir.join("CHUNK_INDEX.md"), index)?;
    Ok(())
}

fn render_instructions(context: &ReviewContext) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Review instructions");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Repository **{}** changed from `{}` to `{}` (kind: {}).",
        context.repo, context.from_commit, context.to_commit, context.kind
    );
    let _ = writeln!(out);
    if context.chunk_count == 1 {
        let _ = writeln!(out, "The change is in `diff.patch`.");
    } else {
        let _ = writeln!(
            out,
            "The change is split into {} chunks under `chunks/`; read `CHUNK_INDEX.md` first.",
            context.chunk_count
        );
    }
    if context.drift {
        let _ = writeln!(out);
        let _ = writeln!(out, "Tracked paths drifted in this range; see `DRIFT.md`.");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "A checkout of the new commit is in `repo/`. Use it to read");
    let _ = writeln!(out, "surrounding context. Write every finding into `OUTPUT/`;");
    let _ = writeln!(out, "nothing else in this directory should be modified.");
    out
}

fn teardown(repo_dir: &Path, session_dir: &Path) {
    let worktree = session_dir.join("repo");
    if worktree.exists() {
        if let Err(err) = vcs::worktree_remove(repo_dir, &worktree) {
            tracing::warn!("worktree removal failed during teardown: {err}");
        }
    }
    if let Err(err) = std::fs::remove_dir_all(session_dir) {
        if session_dir.exists() {
            tracing::warn!("session teardown failed for {}: {err}", session_dir.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    struct Fixture {
        _origin_tmp: TempDir,
        url: String,
        cache: TempDir,
        commits: Vec<String>,
    }

    fn git(dir: &Path, args: &[&str]) -> String {
        let out = Command::new("git").args(args).current_dir(dir).output().expect("git");
        assert!(out.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&out.stderr));
        String::from_utf8_lossy(&out.stdout).trim().to_string()
    }

    /// Origin repo with three commits: base, a cli change, and a change
    /// outside the cli scope.
    fn fixture() -> Fixture {
        let origin_tmp = TempDir::new().expect("tmp");
        let origin = origin_tmp.path().join("origin");
        std::fs::create_dir_all(origin.join("src/cli")).expect("mkdir");
        std::fs::create_dir_all(origin.join("docs")).expect("mkdir");
        git(&origin, &["init", "-q"]);
        git(&origin, &["config", "user.email", "scout@test.invalid"]);
        git(&origin, &["config", "user.name", "scout"]);

        let mut commits = Vec::new();
        std::fs::write(origin.join("src/cli/main.rs"), "fn main() {}\n").expect("write");
        std::fs::write(origin.join("docs/guide.md"), "# guide\n").expect("write");
        git(&origin, &["add", "-A"]);
        git(&origin, &["commit", "-q", "-m", "base"]);
        commits.push(git(&origin, &["rev-parse", "HEAD"]));

        std::fs::write(origin.join("src/cli/main.rs"), "fn main() { run(); }\nfn run() {}\n")
            .expect("write");
        git(&origin, &["add", "-A"]);
        git(&origin, &["commit", "-q", "-m", "cli change"]);
        commits.push(git(&origin, &["rev-parse", "HEAD"]));

        std::fs::write(origin.join("docs/guide.md"), "# guide\n\nmore words\n").expect("write");
        git(&origin, &["add", "-A"]);
        git(&origin, &["commit", "-q", "-m", "docs change"]);
        commits.push(git(&origin, &["rev-parse", "HEAD"]));

        Fixture {
            url: origin.to_string_lossy().to_string(),
            _origin_tmp: origin_tmp,
            cache: TempDir::new().expect("cache"),
            commits,
        }
    }

    fn request<'a>(
        fx: &'a Fixture,
        from: &'a str,
        to: &'a str,
        paths: &'a [String],
    ) -> SessionRequest<'a> {
        SessionRequest {
            repo_full_name: "local/origin",
            url: &fx.url,
            from_commit: from,
            to_commit: to,
            kind: TargetKind::Cli,
            tracked_paths: paths,
        }
    }

    #[test]
    fn builds_session_with_single_diff_patch() {
        if !vcs::git_available() {
            return;
        }
        let fx = fixture();
        let paths = vec!["src/cli".to_string()];
        let req = request(&fx, &fx.commits[0], &fx.commits[1], &paths);
        let outcome =
            build_session(&req, fx.cache.path(), &ScoutConfig::default()).expect("session");

        assert!(!outcome.drift);
        assert_eq!(outcome.chunk_count, 1);
        assert!(outcome.session_dir.join("diff.patch").exists());
        assert!(outcome.session_dir.join("review_context.json").exists());
        assert!(outcome.session_dir.join("REVIEW_INSTRUCTIONS.md").exists());
        assert!(outcome.session_dir.join("OUTPUT").is_dir());
        assert!(outcome.session_dir.join("repo/src/cli/main.rs").exists());
        assert!(!outcome.session_dir.join("DRIFT.md").exists());
        assert!(outcome.stats.files_changed >= 1);

        let context: ReviewContext = crate::domain::read_artifact(
            &outcome.session_dir.join("review_context.json"),
        )
        .expect("context valid");
        assert_eq!(context.repo, "local/origin");
        assert!(!context.drift);
    }

    #[test]
    fn scoped_drift_adopts_unscoped_diff() {
        if !vcs::git_available() {
            return;
        }
        let fx = fixture();
        // Range commits[1]..commits[2] only touches docs/, outside scope.
        let paths = vec!["src/cli".to_string()];
        let req = request(&fx, &fx.commits[1], &fx.commits[2], &paths);
        let outcome =
            build_session(&req, fx.cache.path(), &ScoutConfig::default()).expect("session");

        assert!(outcome.drift);
        assert!(outcome.session_dir.join("DRIFT.md").exists());
        let diff =
            std::fs::read_to_string(outcome.session_dir.join("diff.patch")).expect("read diff");
        assert!(diff.contains("docs/guide.md"));
    }

    #[test]
    fn empty_range_fails_and_leaves_nothing_behind() {
        if !vcs::git_available() {
            return;
        }
        let fx = fixture();
        let paths = vec!["src/cli".to_string()];
        let req = request(&fx, &fx.commits[1], &fx.commits[1], &paths);
        let err = build_session(&req, fx.cache.path(), &ScoutConfig::default())
            .expect_err("no changes expected");
        assert!(matches!(err, ScoutError::NoChangesInScope { .. }));

        let session_dir = session_dir_for(
            fx.cache.path(),
            "local/origin",
            TargetKind::Cli,
            &fx.commits[1],
            &fx.commits[1],
        );
        assert!(!session_dir.exists(), "session dir must be torn down");
    }

    #[test]
    fn configured_ignore_patterns_can_empty_the_diff() {
        if !vcs::git_available() {
            return;
        }
        let fx = fixture();
        // commits[1]..commits[2] only touches docs/; ignoring docs/** leaves
        // nothing reviewable.
        let paths: Vec<String> = Vec::new();
        let req = request(&fx, &fx.commits[1], &fx.commits[2], &paths);
        let mut config = ScoutConfig::default();
        config.review_ignore_patterns = vec!["docs/**".into()];

        let err = build_session(&req, fx.cache.path(), &config).expect_err("nothing in scope");
        assert!(matches!(err, ScoutError::NoChangesInScope { .. }));
    }

    #[test]
    fn repo_scoutignore_keeps_files_out_of_the_diff() {
        if !vcs::git_available() {
            return;
        }
        let origin_tmp = TempDir::new().expect("tmp");
        let origin = origin_tmp.path().join("origin");
        std::fs::create_dir_all(&origin).expect("mkdir");
        git(&origin, &["init", "-q"]);
        git(&origin, &["config", "user.email", "scout@test.invalid"]);
        git(&origin, &["config", "user.name", "scout"]);
        std::fs::write(origin.join(".scoutignore"), "# machine output\ngenerated.txt\n")
            .expect("write");
        std::fs::write(origin.join("code.rs"), "fn a() {}\n").expect("write");
        std::fs::write(origin.join("generated.txt"), "v1\n").expect("write");
        git(&origin, &["add", "-A"]);
        git(&origin, &["commit", "-q", "-m", "base"]);
        let from = git(&origin, &["rev-parse", "HEAD"]);
        std::fs::write(origin.join("code.rs"), "fn a() { let _ = 1; }\n").expect("write");
        std::fs::write(origin.join("generated.txt"), "v2\n").expect("write");
        git(&origin, &["add", "-A"]);
        git(&origin, &["commit", "-q", "-m", "change"]);
        let to = git(&origin, &["rev-parse", "HEAD"]);

        let cache = TempDir::new().expect("cache");
        let url = origin.to_string_lossy().to_string();
        let paths: Vec<String> = Vec::new();
        let req = SessionRequest {
            repo_full_name: "local/ignored",
            url: &url,
            from_commit: &from,
            to_commit: &to,
            kind: TargetKind::Cli,
            tracked_paths: &paths,
        };
        let outcome = build_session(&req, cache.path(), &ScoutConfig::default()).expect("session");

        let diff =
            std::fs::read_to_string(outcome.session_dir.join("diff.patch")).expect("read diff");
        assert!(diff.contains("code.rs"));
        assert!(!diff.contains("generated.txt"));
        assert_eq!(outcome.stats.files_changed, 1);
    }

    #[test]
    fn rename_out_of_scope_is_reported_as_drift() {
        if !vcs::git_available() {
            return;
        }
        let origin_tmp = TempDir::new().expect("tmp");
        let origin = origin_tmp.path().join("origin");
        std::fs::create_dir_all(origin.join("src/cli")).expect("mkdir");
        git(&origin, &["init", "-q"]);
        git(&origin, &["config", "user.email", "scout@test.invalid"]);
        git(&origin, &["config", "user.name", "scout"]);
        std::fs::write(
            origin.join("src/cli/main.rs"),
            "fn main() { println!(\"a stable body so rename detection matches\"); }\n",
        )
        .expect("write");
        git(&origin, &["add", "-A"]);
        git(&origin, &["commit", "-q", "-m", "base"]);
        let from = git(&origin, &["rev-parse", "HEAD"]);

        std::fs::create_dir_all(origin.join("src/app")).expect("mkdir");
        git(&origin, &["mv", "src/cli/main.rs", "src/app/main.rs"]);
        git(&origin, &["commit", "-q", "-m", "move cli"]);
        let to = git(&origin, &["rev-parse", "HEAD"]);

        let cache = TempDir::new().expect("cache");
        let url = origin.to_string_lossy().to_string();
        let paths = vec!["src/cli".to_string()];
        let req = SessionRequest {
            repo_full_name: "local/moved",
            url: &url,
            from_commit: &from,
            to_commit: &to,
            kind: TargetKind::Cli,
            tracked_paths: &paths,
        };
        let outcome = build_session(&req, cache.path(), &ScoutConfig::default()).expect("session");

        assert!(outcome.drift);
        let drift = std::fs::read_to_string(outcome.session_dir.join("DRIFT.md")).expect("drift");
        assert!(drift.contains("src/cli/main.rs"));
        assert!(drift.contains("src/app/main.rs"));
    }

    #[test]
    fn oversized_diff_is_chunked_with_index() {
        if !vcs::git_available() {
            return;
        }
        let fx = fixture();
        let paths: Vec<String> = Vec::new();
        let req = request(&fx, &fx.commits[0], &fx.commits[2], &paths);
        let mut config = ScoutConfig::default();
        config.review_max_tokens = 10; // force one chunk per file
        let outcome = build_session(&req, fx.cache.path(), &config).expect("session");

        assert!(outcome.chunk_count > 1);
        assert!(outcome.session_dir.join("CHUNK_INDEX.md").exists());
        assert!(outcome.session_dir.join("chunks/diff.001.patch").exists());
        assert!(!outcome.session_dir.join("diff.patch").exists());
    }
}
