//! Review launcher: validate a session directory, run the external
//! reviewer over it, and record the outcome.
//!
//! The launcher never mutates session files; its only writes go to the
//! watch store (status transitions).

use crate::config::ScoutConfig;
use crate::error::{Result, ScoutError};
use crate::watch::store::{SessionRow, SessionStatus, WatchStore};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

pub const EXIT_TIMEOUT: i32 = 124;
pub const EXIT_SIGNAL: i32 = 137;

#[derive(Debug)]
pub struct ReviewOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
}

/// Check a session directory has everything a reviewer needs.
pub fn validate_session_dir(dir: &Path) -> std::result::Result<(), String> {
    for required in ["REVIEW_INSTRUCTIONS.md", "review_context.json"] {
        if !dir.join(required).is_file() {
            return Err(format!("missing {required}"));
        }
    }
    for required in ["repo", "OUTPUT"] {
        if !dir.join(required).is_dir() {
            return Err(format!("missing {required}/ directory"));
        }
    }
    if !dir.join("diff.patch").is_file() && !dir.join("chunks").is_dir() {
        return Err("missing diff.patch or chunks/".into());
    }
    Ok(())
}

/// Locate the reviewer executable without running it.
fn reviewer_path(cmd: &str) -> Option<PathBuf> {
    let candidate = Path::new(cmd);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).map(|dir| dir.join(cmd)).find(|p| p.is_file())
}

/// Run the reviewer over a validated session and transition its store row.
pub fn launch_review(
    store: &mut WatchStore,
    session: &SessionRow,
    config: &ScoutConfig,
    interactive: bool,
) -> Result<ReviewOutcome> {
    if let Err(reason) = validate_session_dir(&session.path) {
        return Ok(ReviewOutcome {
            success: false,
            exit_code: None,
            error: Some(format!("session invalid: {reason}")),
        });
    }

    let Some(reviewer) = reviewer_path(&config.reviewer_cmd) else {
        return Err(ScoutError::ReviewerUnavailable { tool: config.reviewer_cmd.clone() });
    };

    store.transition_session(session.id, SessionStatus::Running, None)?;

    let mut command = Command::new(&reviewer);
    if interactive {
        command.arg("REVIEW_INSTRUCTIONS.md");
    } else {
        command.args(["--print", "REVIEW_INSTRUCTIONS.md"]);
        command.stdin(Stdio::null());
    }
    command.current_dir(&session.path);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            store.transition_session(session.id, SessionStatus::Failure, None)?;
            return Ok(ReviewOutcome {
                success: false,
                exit_code: None,
                error: Some(format!("failed to spawn reviewer: {err}")),
            });
        }
    };

    let deadline = Instant::now() + Duration::from_secs(config.review_timeout_secs);
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    break None;
                }
                std::thread::sleep(Duration::from_millis(200));
            }
            Err(err) => {
                store.transition_session(session.id, SessionStatus::Failure, None)?;
                return Ok(ReviewOutcome {
                    success: false,
                    exit_code: None,
                    error: Some(format!("wait on reviewer failed: {err}")),
                });
            }
        }
    };

    let (next, exit_code, error) = match status {
        None => (
            SessionStatus::Failure,
            Some(EXIT_TIMEOUT),
            Some(ScoutError::ReviewerTimedOut { secs: config.review_timeout_secs }.to_string()),
        ),
        Some(status) => match status.code() {
            Some(0) => (SessionStatus::Success, Some(0), None),
            Some(code) => (
                SessionStatus::Failure,
                Some(code),
                Some(ScoutError::ReviewerFailed { code }.to_string()),
            ),
            // Terminated by signal.
            None => (
                SessionStatus::Failure,
                Some(EXIT_SIGNAL),
                Some(ScoutError::ReviewerFailed { code: EXIT_SIGNAL }.to_string()),
            ),
        },
    };

    store.transition_session(session.id, next, exit_code)?;
    Ok(ReviewOutcome { success: next == SessionStatus::Success, exit_code, error })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TargetKind;
    use tempfile::TempDir;

    fn complete_session_dir(tmp: &TempDir) -> PathBuf {
        let dir = tmp.path().join("session");
        std::fs::create_dir_all(dir.join("repo")).expect("mkdir");
        std::fs::create_dir_all(dir.join("OUTPUT")).expect("mkdir");
        std::fs::write(dir.join("REVIEW_INSTRUCTIONS.md"), "# review\n").expect("write");
        std::fs::write(dir.join("review_context.json"), "{}\n").expect("write");
        std::fs::write(dir.join("diff.patch"), "diff --git a/x b/x\n").expect("write");
        dir
    }

    fn store_with_session(tmp: &TempDir, path: &Path) -> (WatchStore, SessionRow) {
        let mut store = WatchStore::new(tmp.path());
        let repo = store
            .upsert_repo("octo/widget", "https://github.com/octo/widget", None, None)
            .expect("repo");
        let change = store
            .append_change(repo.id, "aaa", "bbb", TargetKind::Cli, None, false)
            .expect("change");
        let session = store.append_session(change.id, path).expect("session");
        (store, session)
    }

    #[test]
    fn missing_instructions_fails_without_spawning() {
        let tmp = TempDir::new().expect("tmp");
        let dir = complete_session_dir(&tmp);
        std::fs::remove_file(dir.join("REVIEW_INSTRUCTIONS.md")).expect("remove");
        let (mut store, session) = store_with_session(&tmp, &dir);

        // A reviewer command that cannot exist; validation must fail first.
        let mut config = ScoutConfig::default();
        config.reviewer_cmd = "/nonexistent/reviewer".into();

        let outcome = launch_review(&mut store, &session, &config, false).expect("outcome");
        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap_or("").contains("REVIEW_INSTRUCTIONS.md"));
        // Session stayed pending: the reviewer never started.
        let row = store.session_by_id(session.id).expect("query").expect("row");
        assert_eq!(row.status, SessionStatus::Pending);
    }

    #[test]
    fn absent_reviewer_tool_is_reviewer_unavailable() {
        let tmp = TempDir::new().expect("tmp");
        let dir = complete_session_dir(&tmp);
        let (mut store, session) = store_with_session(&tmp, &dir);

        let mut config = ScoutConfig::default();
        config.reviewer_cmd = "scout-reviewer-that-does-not-exist".into();

        let err = launch_review(&mut store, &session, &config, false).expect_err("unavailable");
        assert!(matches!(err, ScoutError::ReviewerUnavailable { .. }));
    }

    #[test]
    fn successful_reviewer_transitions_to_success() {
        let tmp = TempDir::new().expect("tmp");
        let dir = complete_session_dir(&tmp);
        let (mut store, session) = store_with_session(&tmp, &dir);

        let mut config = ScoutConfig::default();
        config.reviewer_cmd = "true".into();

        let outcome = launch_review(&mut store, &session, &config, false).expect("outcome");
        assert!(outcome.success);
        assert_eq!(outcome.exit_code, Some(0));
        let row = store.session_by_id(session.id).expect("query").expect("row");
        assert_eq!(row.status, SessionStatus::Success);
        assert!(row.started_at.is_some());
        assert!(row.finished_at.is_some());
    }

    #[test]
    fn failing_reviewer_transitions_to_failure() {
        let tmp = TempDir::new().expect("tmp");
        let dir = complete_session_dir(&tmp);
        let (mut store, session) = store_with_session(&tmp, &dir);

        let mut config = ScoutConfig::default();
        config.reviewer_cmd = "false".into();

        let outcome = launch_review(&mut store, &session, &config, false).expect("outcome");
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, Some(1));
        let row = store.session_by_id(session.id).expect("query").expect("row");
        assert_eq!(row.status, SessionStatus::Failure);
    }

    #[test]
    fn hung_reviewer_times_out_with_exit_124() {
        let tmp = TempDir::new().expect("tmp");
        let dir = complete_session_dir(&tmp);
        let script = tmp.path().join("slow-reviewer.sh");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").expect("write");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
                .expect("chmod");
        }
        let (mut store, session) = store_with_session(&tmp, &dir);

        let mut config = ScoutConfig::default();
        config.reviewer_cmd = script.to_string_lossy().to_string();
        config.review_timeout_secs = 1;

        let outcome = launch_review(&mut store, &session, &config, false).expect("outcome");
        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, Some(EXIT_TIMEOUT));
        let row = store.session_by_id(session.id).expect("query").expect("row");
        assert_eq!(row.status, SessionStatus::Failure);
    }

    #[test]
    fn validate_session_dir_requires_diff_or_chunks() {
        let tmp = TempDir::new().expect("tmp");
        let dir = complete_session_dir(&tmp);
        std::fs::remove_file(dir.join("diff.patch")).expect("remove");
        let err = validate_session_dir(&dir).expect_err("invalid");
        assert!(err.contains("diff.patch or chunks/"));

        std::fs::create_dir_all(dir.join("chunks")).expect("mkdir");
        validate_session_dir(&dir).expect("chunks/ satisfies the layout");
    }
}
