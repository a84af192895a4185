//! Translate inferred targets into distinct remote search lanes.

use crate::config::ScoutConfig;
use crate::domain::TargetSet;
use chrono::{Duration, Utc};
use std::collections::BTreeSet;

/// One labeled remote query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lane {
    pub name: String,
    pub query: String,
}

fn kind_query(kind: &str) -> Option<&'static str> {
    match kind {
        "mcp-server" => Some("\"mcp server\" in:name,description"),
        "cli" => Some("cli in:name,description,topics"),
        "skill" => Some("\"claude skill\" in:name,description"),
        "hook" => Some("\"claude hooks\" in:name,description"),
        "plugin" => Some("plugin in:name,topics"),
        "library" => None,
        _ => None,
    }
}

/// Build the ordered, query-deduplicated lane set for a target list.
///
/// Lanes: one language+keyword union lane, one per distinct topic up to
/// the configured cap, then kind-specific lanes. Every query carries the
/// quality clauses (stars, push recency, non-fork, non-archived).
pub fn build_lanes(
    targets: &TargetSet,
    primary_language: Option<&str>,
    config: &ScoutConfig,
) -> Vec<Lane> {
    let quality = quality_clauses(config);
    let mut lanes: Vec<Lane> = Vec::new();
    let mut seen_queries: BTreeSet<String> = BTreeSet::new();

    let mut push = |name: String, base: String, lanes: &mut Vec<Lane>| {
        let query = format!("{base} {quality}");
        if seen_queries.insert(query.clone()) {
            lanes.push(Lane { name, query });
        }
    };

    // Union lane: all keywords, optionally language-biased.
    let mut keywords: Vec<String> = Vec::new();
    let mut keyword_seen: BTreeSet<String> = BTreeSet::new();
    for target in &targets.targets {
        for keyword in &target.hints.keywords {
            if keyword_seen.insert(keyword.clone()) {
                keywords.push(keyword.clone());
            }
        }
    }
    if !keywords.is_empty() {
        let mut base = keywords
            .iter()
            .take(4)
            .map(|k| if k.contains(' ') { format!("\"{k}\"") } else { k.clone() })
            .collect::<Vec<_>>()
            .join(" OR ");
        if let Some(language) = primary_language {
            base.push_str(&format!(" language:{language}"));
        }
        push("lang-union".into(), base, &mut lanes);
    }

    // Topic lanes, capped.
    let mut topics: Vec<String> = Vec::new();
    let mut topic_seen: BTreeSet<String> = BTreeSet::new();
    for target in &targets.targets {
        for topic in &target.hints.topics {
            if topic_seen.insert(topic.clone()) {
                topics.push(topic.clone());
            }
        }
    }
    for topic in topics.into_iter().take(config.max_topic_lanes) {
        push(format!("topic:{topic}"), format!("topic:{topic}"), &mut lanes);
    }

    // Kind lanes.
    for target in &targets.targets {
        if let Some(base) = kind_query(target.kind.as_str()) {
            push(format!("kind:{}", target.kind), base.to_string(), &mut lanes);
        }
    }

    lanes
}

fn quality_clauses(config: &ScoutConfig) -> String {
    let cutoff = Utc::now() - Duration::days(i64::from(config.window_days));
    format!(
        "stars:>={} pushed:>{} fork:false archived:false",
        config.min_stars,
        cutoff.format("%Y-%m-%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ComponentTarget, SearchHints, TargetKind};
    use std::path::PathBuf;

    fn target(kind: TargetKind, keywords: &[&str], topics: &[&str]) -> ComponentTarget {
        ComponentTarget {
            kind,
            confidence: 0.8,
            evidence: vec![],
            hints: SearchHints {
                keywords: keywords.iter().map(|s| s.to_string()).collect(),
                topics: topics.iter().map(|s| s.to_string()).collect(),
                language: None,
            },
        }
    }

    fn target_set(targets: Vec<ComponentTarget>) -> TargetSet {
        TargetSet {
            root: PathBuf::from("/tmp/p"),
            timestamp: "2026-08-01T00:00:00Z".into(),
            targets,
        }
    }

    #[test]
    fn lanes_carry_quality_clauses() {
        let set = target_set(vec![target(TargetKind::Cli, &["cli tool"], &["cli"])]);
        let lanes = build_lanes(&set, Some("rust"), &ScoutConfig::default());
        assert!(!lanes.is_empty());
        for lane in &lanes {
            assert!(lane.query.contains("stars:>="), "missing stars clause: {}", lane.query);
            assert!(lane.query.contains("fork:false"));
            assert!(lane.query.contains("archived:false"));
            assert!(lane.query.contains("pushed:>"));
        }
    }

    #[test]
    fn union_lane_includes_language_bias() {
        let set = target_set(vec![target(TargetKind::Cli, &["cli tool"], &[])]);
        let lanes = build_lanes(&set, Some("rust"), &ScoutConfig::default());
        let union = lanes.iter().find(|l| l.name == "lang-union").expect("union lane");
        assert!(union.query.contains("language:rust"));
    }

    #[test]
    fn duplicate_queries_are_dropped() {
        let set = target_set(vec![
            target(TargetKind::Cli, &[], &["cli"]),
            target(TargetKind::Plugin, &[], &["cli"]),
        ]);
        let lanes = build_lanes(&set, None, &ScoutConfig::default());
        let topic_lanes: Vec<_> = lanes.iter().filter(|l| l.name == "topic:cli").collect();
        assert_eq!(topic_lanes.len(), 1);
    }

    #[test]
    fn topic_lanes_respect_cap() {
        let mut config = ScoutConfig::default();
        config.max_topic_lanes = 2;
        let set = target_set(vec![target(TargetKind::Cli, &[], &["a", "b", "c", "d"])]);
        let lanes = build_lanes(&set, None, &config);
        let topic_count = lanes.iter().filter(|l| l.name.starts_with("topic:")).count();
        assert_eq!(topic_count, 2);
    }
}
