//! Integration tests for the scout CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn scout() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("scout"))
}

#[test]
fn cli_version_prints_name() {
    let mut cmd = scout();
    cmd.arg("--version");
    cmd.assert().success().stdout(predicate::str::contains("scout"));
}

#[test]
fn cli_help_lists_stable_commands() {
    let mut cmd = scout();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("discover"))
        .stdout(predicate::str::contains("clone"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("focus"))
        .stdout(predicate::str::contains("compare"));
}

#[test]
fn unknown_command_exits_one() {
    let mut cmd = scout();
    cmd.arg("teleport");
    cmd.assert().failure().code(1);
}

#[test]
fn scan_writes_fingerprint_and_targets() {
    let tmp = TempDir::new().expect("tmp");
    let root = tmp.path();
    fs::create_dir_all(root.join(".claude/hooks")).expect("mkdir");
    fs::write(root.join("SKILL.md"), "# a skill\n").expect("write");
    fs::write(root.join("run.py"), "print('x')\n").expect("write");

    let mut cmd = scout();
    cmd.args(["scan", "--path", root.to_str().expect("utf8")]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("skill"))
        .stdout(predicate::str::contains("hook"));

    let fingerprint =
        fs::read_to_string(root.join(".scout/fingerprint.json")).expect("fingerprint written");
    let parsed: serde_json::Value = serde_json::from_str(&fingerprint).expect("json");
    assert_eq!(parsed["languages"]["python"], serde_json::json!(1));

    let targets = fs::read_to_string(root.join(".scout/targets.json")).expect("targets written");
    let parsed: serde_json::Value = serde_json::from_str(&targets).expect("json");
    let kinds: Vec<&str> = parsed["targets"]
        .as_array()
        .expect("targets array")
        .iter()
        .map(|t| t["kind"].as_str().expect("kind"))
        .collect();
    assert!(kinds.contains(&"skill"));
    assert!(kinds.contains(&"hook"));

    // Every confidence is two-decimal and within [0,1].
    for target in parsed["targets"].as_array().expect("targets array") {
        let confidence = target["confidence"].as_f64().expect("confidence");
        assert!(confidence <= 1.0);
        let rounded = (confidence * 100.0).round() / 100.0;
        assert!((confidence - rounded).abs() < f64::EPSILON, "bad rounding: {confidence}");
    }
}

#[test]
fn scan_json_prints_to_stdout() {
    let tmp = TempDir::new().expect("tmp");
    fs::write(tmp.path().join("main.go"), "package main\n").expect("write");

    let mut cmd = scout();
    cmd.args(["scan", "--path", tmp.path().to_str().expect("utf8"), "--json"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"fingerprint\""))
        .stdout(predicate::str::contains("\"go\""));
}

#[test]
fn discover_without_scan_fails_with_reason() {
    let tmp = TempDir::new().expect("tmp");
    let mut cmd = scout();
    cmd.args(["discover", "--path", tmp.path().to_str().expect("utf8")]);
    cmd.assert().failure().code(1).stderr(predicate::str::contains("scout scan"));
}

#[test]
fn clone_without_discover_fails_with_reason() {
    let tmp = TempDir::new().expect("tmp");
    let mut cmd = scout();
    cmd.args(["clone", "--path", tmp.path().to_str().expect("utf8")]);
    cmd.assert().failure().code(1).stderr(predicate::str::contains("scout discover"));
}

#[test]
fn validate_without_clone_fails_with_reason() {
    let tmp = TempDir::new().expect("tmp");
    let mut cmd = scout();
    cmd.args(["validate", "--path", tmp.path().to_str().expect("utf8")]);
    cmd.assert().failure().code(1).stderr(predicate::str::contains("scout clone"));
}

#[test]
fn bad_project_config_is_rejected() {
    let tmp = TempDir::new().expect("tmp");
    fs::write(tmp.path().join(".scoutrc.json"), r#"{"not_a_real_key": 1}"#).expect("write");
    fs::write(tmp.path().join("main.rs"), "fn main() {}\n").expect("write");
    // scan itself does not read config, but discover does.
    let mut cmd = scout();
    cmd.args(["scan", "--path", tmp.path().to_str().expect("utf8")]);
    cmd.assert().success();

    let mut cmd = scout();
    cmd.args(["discover", "--path", tmp.path().to_str().expect("utf8")]);
    cmd.assert().failure().code(1).stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn track_rejects_bare_repo_name() {
    let tmp = TempDir::new().expect("tmp");
    let mut cmd = scout();
    cmd.env("SCOUT_CACHE_DIR", tmp.path());
    cmd.args(["track", "widget", "--kind", "cli"]);
    cmd.assert().failure().code(1).stderr(predicate::str::contains("owner/name"));
}

#[test]
fn track_then_list_round_trips() {
    let tmp = TempDir::new().expect("tmp");

    let mut cmd = scout();
    cmd.env("SCOUT_CACHE_DIR", tmp.path());
    cmd.args(["track", "octo/widget", "--kind", "cli", "--paths", "src/cli,src/main.rs"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Tracking octo/widget"))
        .stderr(predicate::str::contains("experimental"));

    let mut cmd = scout();
    cmd.env("SCOUT_CACHE_DIR", tmp.path());
    cmd.args(["watch", "list"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("octo/widget"))
        .stdout(predicate::str::contains("src/cli"));

    let mut cmd = scout();
    cmd.env("SCOUT_CACHE_DIR", tmp.path());
    cmd.args(["watch", "list", "--json"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"kind\": \"cli\""))
        .stdout(predicate::str::contains("\"enabled\": true"));
}

#[test]
fn watch_remove_unknown_entry_reports_not_tracked() {
    let tmp = TempDir::new().expect("tmp");
    let mut cmd = scout();
    cmd.env("SCOUT_CACHE_DIR", tmp.path());
    cmd.args(["watch", "remove", "octo/ghost", "--kind", "cli"]);
    cmd.assert().success().stdout(predicate::str::contains("was not tracked"));
}

#[test]
fn watch_status_reports_idle() {
    let tmp = TempDir::new().expect("tmp");
    let mut cmd = scout();
    cmd.env("SCOUT_CACHE_DIR", tmp.path());
    cmd.args(["watch", "status"]);
    cmd.assert().success().stdout(predicate::str::contains("idle"));
}

#[test]
fn watch_sessions_empty_store_prints_none() {
    let tmp = TempDir::new().expect("tmp");
    let mut cmd = scout();
    cmd.env("SCOUT_CACHE_DIR", tmp.path());
    cmd.args(["watch", "sessions"]);
    cmd.assert().success().stdout(predicate::str::contains("no sessions"));
}

#[test]
fn review_rejects_run_and_skip_together() {
    let tmp = TempDir::new().expect("tmp");
    let mut cmd = scout();
    cmd.env("SCOUT_CACHE_DIR", tmp.path());
    cmd.args(["review", "/tmp/nowhere", "--run", "--skip"]);
    cmd.assert().failure().code(1);
}

#[test]
fn review_of_unknown_session_fails_with_reason() {
    let tmp = TempDir::new().expect("tmp");
    let session = tmp.path().join("session");
    fs::create_dir_all(&session).expect("mkdir");
    let mut cmd = scout();
    cmd.env("SCOUT_CACHE_DIR", tmp.path());
    cmd.args(["review", session.to_str().expect("utf8")]);
    cmd.assert().failure().code(1).stderr(predicate::str::contains("no session row"));
}

#[test]
fn experimental_warning_appears_once_per_process() {
    let tmp = TempDir::new().expect("tmp");
    let mut cmd = scout();
    cmd.env("SCOUT_CACHE_DIR", tmp.path());
    cmd.args(["watch", "list"]);
    let output = cmd.assert().success().get_output().stderr.clone();
    let text = String::from_utf8_lossy(&output);
    assert_eq!(text.matches("experimental").count(), 1);
}
