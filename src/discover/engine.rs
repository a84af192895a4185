//! Lane execution, dedup, filtering, and Tier-1 scoring.

use super::cache::ApiCache;
use super::lanes::Lane;
use crate::config::ScoutConfig;
use crate::error::{Result, ScoutError};
use crate::rank::tier1_score;
use crate::remote::{RemoteRepoItem, SearchClient};
use crate::utils::{short_hash, utc_timestamp};
use crate::domain::{Candidate, CandidateSet};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

const MAX_RATE_LIMIT_ATTEMPTS: u32 = 5;

struct Draft {
    item: RemoteRepoItem,
    lanes: Vec<String>,
}

/// Execute every lane, dedupe and filter the raw items, and produce the
/// Tier-1 candidate set. A lane that errors is abandoned; the run
/// continues with the remaining lanes.
pub fn discover<C: SearchClient>(
    client: &C,
    lanes: &[Lane],
    cache: &ApiCache,
    config: &ScoutConfig,
) -> Result<CandidateSet> {
    let now = Utc::now();
    let mut drafts: BTreeMap<String, Draft> = BTreeMap::new();
    let mut successful_calls: u32 = 0;
    let mut rate_limited_lanes = 0usize;

    for lane in lanes {
        match run_lane(client, lane, cache, config, &mut successful_calls) {
            Ok(items) => {
                for item in items {
                    let entry = drafts.entry(item.id.clone()).or_insert_with(|| Draft {
                        item: item.clone(),
                        lanes: Vec::new(),
                    });
                    if !entry.lanes.contains(&lane.name) {
                        entry.lanes.push(lane.name.clone());
                    }
                }
            }
            Err(ScoutError::RemoteRateLimited { .. }) => {
                tracing::warn!("lane '{}' abandoned: rate limit budget exhausted", lane.name);
                rate_limited_lanes += 1;
            }
            Err(err) => {
                tracing::warn!("lane '{}' aborted: {err}", lane.name);
            }
        }
    }

    if !lanes.is_empty() && rate_limited_lanes == lanes.len() {
        return Err(ScoutError::RemoteRateLimited { attempts: MAX_RATE_LIMIT_ATTEMPTS });
    }

    let mut candidates: Vec<Candidate> = drafts
        .into_values()
        .filter(|draft| passes_filters(&draft.item, now, config))
        .map(|draft| {
            let days = days_since_push(&draft.item.pushed_at, now);
            let score =
                tier1_score(draft.item.stars, draft.item.forks, days, draft.lanes.len(), config);
            Candidate {
                id: draft.item.id,
                url: draft.item.url,
                stars: draft.item.stars,
                forks: draft.item.forks,
                pushed_at: draft.item.pushed_at,
                license: draft.item.license,
                description: draft.item.description,
                topics: draft.item.topics,
                lanes: draft.lanes,
                tier1_score: score,
            }
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.tier1_score
            .partial_cmp(&a.tier1_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    candidates.truncate(config.tier1_cap);

    let run_id = short_hash(&format!("{}-{}", utc_timestamp(), candidates.len()));
    Ok(CandidateSet { run_id, timestamp: utc_timestamp(), candidates })
}

fn run_lane<C: SearchClient>(
    client: &C,
    lane: &Lane,
    cache: &ApiCache,
    config: &ScoutConfig,
    successful_calls: &mut u32,
) -> Result<Vec<RemoteRepoItem>> {
    let mut items = Vec::new();
    for page in 1..=config.max_pages_per_lane {
        if let Some(cached) = cache.lookup(&lane.query, page) {
            let page_len = cached.len();
            items.extend(cached);
            if page_len < 30 {
                break;
            }
            continue;
        }
        let fetched = search_with_backoff(client, &lane.query, page, config)?;
        *successful_calls += 1;
        // Past the threshold, successive calls slow down exponentially.
        if *successful_calls > config.rate_limit_threshold {
            let over = (*successful_calls - config.rate_limit_threshold).min(8);
            let pause_ms = (250u64 << over).min(config.backoff_max_secs * 1000);
            std::thread::sleep(Duration::from_millis(pause_ms));
        }
        cache.store(&lane.query, page, &fetched);
        let page_len = fetched.len();
        items.extend(fetched);
        // A short page means the remote has nothing further.
        if page_len < 30 {
            break;
        }
    }
    Ok(items)
}

fn search_with_backoff<C: SearchClient>(
    client: &C,
    query: &str,
    page: u32,
    config: &ScoutConfig,
) -> Result<Vec<RemoteRepoItem>> {
    let mut delay_secs: u64 = 2;
    for attempt in 1..=MAX_RATE_LIMIT_ATTEMPTS {
        match client.search(query, page) {
            Ok(items) => return Ok(items),
            Err(ScoutError::RemoteRateLimited { .. }) if attempt < MAX_RATE_LIMIT_ATTEMPTS => {
                let wait = delay_secs.min(config.backoff_max_secs);
                tracing::debug!("rate limited; backing off {wait}s (attempt {attempt})");
                std::thread::sleep(Duration::from_secs(wait));
                delay_secs = delay_secs.saturating_mul(2);
            }
            Err(err) => return Err(err),
        }
    }
    Err(ScoutError::RemoteRateLimited { attempts: MAX_RATE_LIMIT_ATTEMPTS })
}

fn days_since_push(pushed_at: &str, now: DateTime<Utc>) -> f64 {
    DateTime::parse_from_rfc3339(pushed_at)
        .map(|ts| {
            let secs = now.signed_duration_since(ts.with_timezone(&Utc)).num_seconds();
            secs.max(0) as f64 / 86_400.0
        })
        .unwrap_or(f64::MAX)
}

fn passes_filters(item: &RemoteRepoItem, now: DateTime<Utc>, config: &ScoutConfig) -> bool {
    if item.archived || item.fork {
        return false;
    }
    // License allow-list; unknown licenses are permitted.
    if let Some(license) = &item.license {
        if !config.license_allowlist.iter().any(|allowed| allowed == license) {
            return false;
        }
    }
    let haystack = format!(
        "{} {}",
        item.id.to_ascii_lowercase(),
        item.description.as_deref().unwrap_or("").to_ascii_lowercase()
    );
    if config.exclude_keywords.iter().any(|kw| haystack.contains(&kw.to_ascii_lowercase())) {
        return false;
    }
    days_since_push(&item.pushed_at, now) <= f64::from(config.window_days)
}
