//! Layered config loading: defaults < global file < project file < env.

use super::ScoutConfig;
use crate::error::{Result, ScoutError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Partial configuration as it appears in a config file. Every field is
/// optional; unknown keys are rejected so typos surface instead of being
/// silently ignored.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverlay {
    pub min_stars: Option<u64>,
    pub window_days: Option<u32>,
    pub tier1_cap: Option<usize>,
    pub max_topic_lanes: Option<usize>,
    pub max_pages_per_lane: Option<u32>,
    pub api_cache_ttl_hours: Option<u32>,
    pub backoff_max_secs: Option<u64>,
    pub rate_limit_threshold: Option<u32>,
    pub exclude_keywords: Option<Vec<String>>,
    pub license_allowlist: Option<Vec<String>>,
    pub w_recency: Option<f64>,
    pub w_activity: Option<f64>,
    pub w_lanes: Option<f64>,
    pub w_structural: Option<f64>,
    pub w_modernity: Option<f64>,
    pub clone_budget: Option<usize>,
    pub max_entrypoints_per_kind: Option<usize>,
    pub max_dirs_per_target: Option<usize>,
    pub max_files_per_dir: Option<usize>,
    pub review_max_tokens: Option<usize>,
    pub review_max_files_per_chunk: Option<usize>,
    pub review_ignore_patterns: Option<Vec<String>>,
    pub reviewer_cmd: Option<String>,
    pub reviewer_skill: Option<String>,
    pub review_timeout_secs: Option<u64>,
}

/// Load and merge the full configuration for a project root.
pub fn load_config(project_root: &Path) -> Result<ScoutConfig> {
    let mut config = ScoutConfig::default();

    if let Some(global) = global_config_path() {
        if global.exists() {
            apply_overlay(&mut config, read_overlay(&global)?);
        }
    }

    let project = project_root.join(".scoutrc.json");
    if project.exists() {
        apply_overlay(&mut config, read_overlay(&project)?);
    }

    apply_env(&mut config);

    config.validate()?;
    Ok(config)
}

fn global_config_path() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("SCOUT_CONFIG_DIR") {
        return Some(PathBuf::from(dir).join("config.json"));
    }
    dirs::config_dir().map(|base| base.join("repo-scout").join("config.json"))
}

fn read_overlay(path: &Path) -> Result<ConfigOverlay> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|err| ScoutError::ConfigInvalid {
        reason: format!("{}: {err}", path.display()),
    })
}

fn apply_overlay(config: &mut ScoutConfig, overlay: ConfigOverlay) {
    macro_rules! take {
        ($field:ident) => {
            if let Some(value) = overlay.$field {
                config.$field = value;
            }
        };
    }
    take!(min_stars);
    take!(window_days);
    take!(tier1_cap);
    take!(max_topic_lanes);
    take!(max_pages_per_lane);
    take!(api_cache_ttl_hours);
    take!(backoff_max_secs);
    take!(rate_limit_threshold);
    take!(exclude_keywords);
    take!(license_allowlist);
    take!(w_recency);
    take!(w_activity);
    take!(w_lanes);
    take!(w_structural);
    take!(w_modernity);
    take!(clone_budget);
    take!(max_entrypoints_per_kind);
    take!(max_dirs_per_target);
    take!(max_files_per_dir);
    take!(review_max_tokens);
    take!(review_max_files_per_chunk);
    take!(review_ignore_patterns);
    take!(reviewer_cmd);
    take!(reviewer_skill);
    take!(review_timeout_secs);
}

/// Apply `SCOUT_*` environment overrides. Numeric values parse strictly;
/// an unparseable value keeps the previous layer and logs a warning.
fn apply_env(config: &mut ScoutConfig) {
    macro_rules! env_num {
        ($var:literal, $field:ident, $ty:ty) => {
            if let Ok(raw) = std::env::var($var) {
                match raw.trim().parse::<$ty>() {
                    Ok(value) => config.$field = value,
                    Err(_) => {
                        tracing::warn!("ignoring {}='{}': not a valid number", $var, raw);
                    }
                }
            }
        };
    }
    env_num!("SCOUT_MIN_STARS", min_stars, u64);
    env_num!("SCOUT_WINDOW_DAYS", window_days, u32);
    env_num!("SCOUT_TIER1_CAP", tier1_cap, usize);
    env_num!("SCOUT_MAX_TOPIC_LANES", max_topic_lanes, usize);
    env_num!("SCOUT_MAX_PAGES_PER_LANE", max_pages_per_lane, u32);
    env_num!("SCOUT_API_CACHE_TTL_HOURS", api_cache_ttl_hours, u32);
    env_num!("SCOUT_BACKOFF_MAX_SECS", backoff_max_secs, u64);
    env_num!("SCOUT_RATE_LIMIT_THRESHOLD", rate_limit_threshold, u32);
    env_num!("SCOUT_CLONE_BUDGET", clone_budget, usize);
    env_num!("SCOUT_REVIEW_MAX_TOKENS", review_max_tokens, usize);
    env_num!("SCOUT_REVIEW_TIMEOUT_SECS", review_timeout_secs, u64);

    if let Ok(cmd) = std::env::var("SCOUT_REVIEWER_CMD") {
        if !cmd.trim().is_empty() {
            config.reviewer_cmd = cmd.trim().to_string();
        }
    }
}

/// Remote API token: `GITHUB_TOKEN` wins; otherwise ask the host `gh` CLI.
pub fn github_token() -> Option<String> {
    if let Ok(token) = std::env::var("GITHUB_TOKEN") {
        let token = token.trim().to_string();
        if !token.is_empty() {
            return Some(token);
        }
    }
    let output = Command::new("gh").args(["auth", "token"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
