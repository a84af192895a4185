//! Concrete artifact records for every pipeline stage.

use super::{check_repo_id, check_score, check_timestamp, check_url, Artifact, TargetKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Immutable snapshot of a source tree produced by `scout scan`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintArtifact {
    pub root: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    pub timestamp: String,
    /// Language label → file count; BTreeMap keeps serialized keys unique
    /// and ordered so repeated scans are byte-equal.
    pub languages: BTreeMap<String, u64>,
    pub markers: Vec<String>,
}

impl Artifact for FingerprintArtifact {
    const NAME: &'static str = "fingerprint";

    fn validate(&self) -> Result<(), String> {
        check_timestamp("timestamp", &self.timestamp)?;
        if self.root.as_os_str().is_empty() {
            return Err("root path is empty".into());
        }
        let mut seen = std::collections::BTreeSet::new();
        for marker in &self.markers {
            if !seen.insert(marker) {
                return Err(format!("duplicate marker '{marker}'"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHints {
    pub keywords: Vec<String>,
    pub topics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// One inferred component target with rounded confidence and search hints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentTarget {
    pub kind: TargetKind,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub hints: SearchHints,
}

/// `targets.json`: ordered targets from `scout infer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSet {
    pub root: PathBuf,
    pub timestamp: String,
    pub targets: Vec<ComponentTarget>,
}

impl Artifact for TargetSet {
    const NAME: &'static str = "targets";

    fn validate(&self) -> Result<(), String> {
        check_timestamp("timestamp", &self.timestamp)?;
        for target in &self.targets {
            check_score(&format!("{} confidence", target.kind), target.confidence)?;
            // Confidences are stored rounded to two decimals.
            let rounded = (target.confidence * 100.0).round() / 100.0;
            if (target.confidence - rounded).abs() > f64::EPSILON {
                return Err(format!(
                    "{} confidence {} not rounded to 2 decimal places",
                    target.kind, target.confidence
                ));
            }
        }
        Ok(())
    }
}

/// Tier-1 candidate keyed by `owner/name`, scored at discovery time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub url: String,
    pub stars: u64,
    pub forks: u64,
    pub pushed_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub lanes: Vec<String>,
    pub tier1_score: f64,
}

/// `candidates.tier1.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSet {
    pub run_id: String,
    pub timestamp: String,
    pub candidates: Vec<Candidate>,
}

impl Artifact for CandidateSet {
    const NAME: &'static str = "candidates.tier1";

    fn validate(&self) -> Result<(), String> {
        check_timestamp("timestamp", &self.timestamp)?;
        let mut seen = std::collections::BTreeSet::new();
        for candidate in &self.candidates {
            check_repo_id("candidate id", &candidate.id)?;
            check_url("candidate url", &candidate.url)?;
            check_timestamp("pushed_at", &candidate.pushed_at)?;
            check_score(&format!("{} tier1_score", candidate.id), candidate.tier1_score)?;
            if !seen.insert(&candidate.id) {
                return Err(format!("duplicate candidate id '{}'", candidate.id));
            }
        }
        Ok(())
    }
}

/// One fetched repository in the content-addressed cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneEntry {
    pub id: String,
    pub url: String,
    pub path: PathBuf,
    pub commit: String,
    pub tier1_score: f64,
}

/// `clone-manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneManifest {
    pub run_id: String,
    pub timestamp: String,
    pub entries: Vec<CloneEntry>,
}

impl Artifact for CloneManifest {
    const NAME: &'static str = "clone-manifest";

    fn validate(&self) -> Result<(), String> {
        check_timestamp("timestamp", &self.timestamp)?;
        for entry in &self.entries {
            check_repo_id("clone id", &entry.id)?;
            check_url("clone url", &entry.url)?;
            check_score(&format!("{} tier1_score", entry.id), entry.tier1_score)?;
            if entry.commit.is_empty() {
                return Err(format!("{} has empty commit id", entry.id));
            }
        }
        Ok(())
    }
}

/// One structural detector match with evidence and focus roots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedTarget {
    pub kind: TargetKind,
    pub evidence: Vec<String>,
    pub focus_roots: Vec<String>,
}

/// One modernity check outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModernitySignal {
    pub name: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Per-repository validation outcome; one file per repo plus a summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub id: String,
    pub path: PathBuf,
    pub matches: Vec<MatchedTarget>,
    pub modernity: Vec<ModernitySignal>,
    pub structural_count: usize,
    pub modernity_score: f64,
    pub tier1_score: f64,
    pub tier2_score: f64,
    /// (kind, candidate entrypoint paths) consumed by the focus bundler.
    pub entry_candidates: Vec<(TargetKind, Vec<String>)>,
}

impl Artifact for ValidationResult {
    const NAME: &'static str = "validation";

    fn validate(&self) -> Result<(), String> {
        check_repo_id("id", &self.id)?;
        check_score("modernity_score", self.modernity_score)?;
        check_score("tier1_score", self.tier1_score)?;
        check_score("tier2_score", self.tier2_score)?;
        let distinct: std::collections::BTreeSet<TargetKind> =
            self.matches.iter().map(|m| m.kind).collect();
        if distinct.len() != self.structural_count {
            return Err(format!(
                "structural_count {} does not match {} distinct kinds",
                self.structural_count,
                distinct.len()
            ));
        }
        Ok(())
    }
}

/// `validate-summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub run_id: String,
    pub timestamp: String,
    pub results: Vec<ValidationResult>,
}

impl Artifact for ValidationSummary {
    const NAME: &'static str = "validate-summary";

    fn validate(&self) -> Result<(), String> {
        check_timestamp("timestamp", &self.timestamp)?;
        for result in &self.results {
            result.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusEntrypoint {
    pub kind: TargetKind,
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusFile {
    pub path: String,
    pub size_bytes: u64,
}

/// `FOCUS.json`: depth-budgeted, entrypoint-oriented selection per repo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusBundle {
    pub id: String,
    pub entrypoints: Vec<FocusEntrypoint>,
    pub scope_roots: Vec<String>,
    pub files: Vec<FocusFile>,
}

impl Artifact for FocusBundle {
    const NAME: &'static str = "focus";

    fn validate(&self) -> Result<(), String> {
        check_repo_id("id", &self.id)?;
        // Scope roots are prefix-minimal: no root may contain another.
        for (i, a) in self.scope_roots.iter().enumerate() {
            for (j, b) in self.scope_roots.iter().enumerate() {
                if i != j && b.starts_with(&format!("{a}/")) {
                    return Err(format!("scope root '{b}' is nested under '{a}'"));
                }
            }
        }
        Ok(())
    }
}

/// `PROVENANCE.json`: immutable record of where a bundle came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub id: String,
    pub url: String,
    pub commit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    pub tier1_score: f64,
    pub tier2_score: f64,
    pub tool_version: String,
    pub run_id: String,
    pub timestamp: String,
}

impl Artifact for Provenance {
    const NAME: &'static str = "provenance";

    fn validate(&self) -> Result<(), String> {
        check_repo_id("id", &self.id)?;
        check_url("url", &self.url)?;
        check_score("tier1_score", self.tier1_score)?;
        check_score("tier2_score", self.tier2_score)?;
        check_timestamp("timestamp", &self.timestamp)
    }
}

/// Ranked per-repo summary line in the compare report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoSummary {
    pub id: String,
    pub tier2_score: f64,
    pub tier1_score: f64,
    pub structural_count: usize,
    pub modernity_score: f64,
    pub matched_kinds: Vec<TargetKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationSummary {
    pub id: String,
    pub tier2_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub discovered: usize,
    pub cloned: usize,
    pub validated: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_recommendation: Option<RecommendationSummary>,
}

/// `report.json`: full compare report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareReport {
    pub run_id: String,
    pub timestamp: String,
    pub source: TargetSet,
    pub ranked: Vec<RepoSummary>,
    pub pipeline: PipelineSummary,
}

impl Artifact for CompareReport {
    const NAME: &'static str = "report";

    fn validate(&self) -> Result<(), String> {
        check_timestamp("timestamp", &self.timestamp)?;
        for summary in &self.ranked {
            check_repo_id("ranked id", &summary.id)?;
            check_score("tier2_score", summary.tier2_score)?;
            check_score("tier1_score", summary.tier1_score)?;
            check_score("modernity_score", summary.modernity_score)?;
        }
        if let Some(top) = &self.pipeline.top_recommendation {
            check_repo_id("top recommendation", &top.id)?;
            check_score("top tier2_score", top.tier2_score)?;
        }
        Ok(())
    }
}
