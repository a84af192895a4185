//! Tier-1 and Tier-2 scoring.
//!
//! Both scores are pure functions of their inputs; repeated calls yield
//! the same float. All outputs lie in [0,1].

use crate::config::ScoutConfig;

const ACTIVITY_DIVISOR: f64 = 10.0;
const LANE_CAP: usize = 3;
const STRUCTURAL_CAP: usize = 3;

pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Round to two decimal places so `0.4 + 0.2` serializes as exactly `0.6`.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Discovery-time score from recency, activity, and lane agreement.
pub fn tier1_score(
    stars: u64,
    forks: u64,
    days_since_push: f64,
    lane_hits: usize,
    config: &ScoutConfig,
) -> f64 {
    let window = f64::from(config.window_days);
    let recency_norm = clamp01(1.0 - days_since_push / window);
    let activity = ((stars + forks + 1) as f64).log10();
    let activity_norm = clamp01(activity / ACTIVITY_DIVISOR);
    let lane_norm = lane_hits.min(LANE_CAP) as f64 / LANE_CAP as f64;
    clamp01(
        config.w_recency * recency_norm
            + config.w_activity * activity_norm
            + config.w_lanes * lane_norm,
    )
}

/// Validation-time score layering structure and modernity onto tier-1.
pub fn tier2_score(
    tier1: f64,
    structural_count: usize,
    modernity_score: f64,
    config: &ScoutConfig,
) -> f64 {
    let structural_norm = structural_count.min(STRUCTURAL_CAP) as f64 / STRUCTURAL_CAP as f64;
    clamp01(tier1 + config.w_structural * structural_norm + config.w_modernity * modernity_score)
}
