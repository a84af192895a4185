//! Configuration loading and merging
//!
//! Precedence (highest last): defaults → global config file → project
//! `.scoutrc.json` → `SCOUT_*` environment variables. The merged result is
//! validated once; unknown keys in any file are rejected.

mod loader;

pub use loader::{github_token, load_config, ConfigOverlay};

use crate::error::ScoutError;
use serde::{Deserialize, Serialize};

/// Fully merged runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoutConfig {
    // Discovery
    pub min_stars: u64,
    pub window_days: u32,
    pub tier1_cap: usize,
    pub max_topic_lanes: usize,
    pub max_pages_per_lane: u32,
    pub api_cache_ttl_hours: u32,
    pub backoff_max_secs: u64,
    /// Successful remote calls beyond this count are rate-limited by an
    /// inter-call sleep.
    pub rate_limit_threshold: u32,
    pub exclude_keywords: Vec<String>,
    pub license_allowlist: Vec<String>,

    // Scoring weights (defaults sum to 1.0 for tier-1)
    pub w_recency: f64,
    pub w_activity: f64,
    pub w_lanes: f64,
    pub w_structural: f64,
    pub w_modernity: f64,

    // Clone
    pub clone_budget: usize,

    // Focus
    pub max_entrypoints_per_kind: usize,
    pub max_dirs_per_target: usize,
    pub max_files_per_dir: usize,

    // Review sessions
    pub review_max_tokens: usize,
    pub review_max_files_per_chunk: usize,
    /// Extra pathspec patterns excluded from every review diff, merged
    /// with the built-in lockfile/binary/build-output set.
    pub review_ignore_patterns: Vec<String>,
    pub reviewer_cmd: String,
    pub reviewer_skill: String,
    pub review_timeout_secs: u64,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            min_stars: 20,
            window_days: 90,
            tier1_cap: 20,
            max_topic_lanes: 4,
            max_pages_per_lane: 2,
            api_cache_ttl_hours: 24,
            backoff_max_secs: 60,
            rate_limit_threshold: 8,
            exclude_keywords: vec![
                "awesome".into(),
                "tutorial".into(),
                "course".into(),
                "boilerplate".into(),
                "deprecated".into(),
            ],
            license_allowlist: vec![
                "MIT".into(),
                "Apache-2.0".into(),
                "BSD-2-Clause".into(),
                "BSD-3-Clause".into(),
                "ISC".into(),
                "MPL-2.0".into(),
                "Unlicense".into(),
            ],
            w_recency: 0.4,
            w_activity: 0.4,
            w_lanes: 0.2,
            w_structural: 0.2,
            w_modernity: 0.2,
            clone_budget: 5,
            max_entrypoints_per_kind: 3,
            max_dirs_per_target: 8,
            max_files_per_dir: 25,
            review_max_tokens: 60_000,
            review_max_files_per_chunk: 30,
            review_ignore_patterns: Vec::new(),
            reviewer_cmd: "claude".into(),
            reviewer_skill: "code-review".into(),
            review_timeout_secs: 1800,
        }
    }
}

impl ScoutConfig {
    /// Range constraints applied after the final merge.
    pub fn validate(&self) -> Result<(), ScoutError> {
        let weights = [
            ("w_recency", self.w_recency),
            ("w_activity", self.w_activity),
            ("w_lanes", self.w_lanes),
            ("w_structural", self.w_structural),
            ("w_modernity", self.w_modernity),
        ];
        for (name, value) in weights {
            if !(0.0..=1.0).contains(&value) {
                return Err(ScoutError::ConfigInvalid {
                    reason: format!("{name} = {value} outside [0,1]"),
                });
            }
        }
        let tier1_sum = self.w_recency + self.w_activity + self.w_lanes;
        if tier1_sum > 1.0 + 1e-9 {
            return Err(ScoutError::ConfigInvalid {
                reason: format!("tier-1 weights sum {tier1_sum} exceeds 1.0"),
            });
        }
        if self.tier1_cap == 0 {
            return Err(ScoutError::ConfigInvalid { reason: "tier1_cap must be >= 1".into() });
        }
        if self.clone_budget == 0 {
            return Err(ScoutError::ConfigInvalid { reason: "clone_budget must be >= 1".into() });
        }
        if self.window_days == 0 {
            return Err(ScoutError::ConfigInvalid { reason: "window_days must be >= 1".into() });
        }
        if self.review_max_tokens == 0 {
            return Err(ScoutError::ConfigInvalid {
                reason: "review_max_tokens must be >= 1".into(),
            });
        }
        if self.review_max_files_per_chunk == 0 {
            return Err(ScoutError::ConfigInvalid {
                reason: "review_max_files_per_chunk must be >= 1".into(),
            });
        }
        Ok(())
    }
}
