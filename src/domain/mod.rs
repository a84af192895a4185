//! Artifact records exchanged between pipeline stages.
//!
//! Every persisted JSON artifact has a typed record here and is validated
//! both when written and when read back. A read that fails validation
//! surfaces `ArtifactInvalid`; config is the only soft-fail reader.

pub mod artifacts;

pub use artifacts::{
    Candidate, CandidateSet, CloneEntry, CloneManifest, CompareReport, ComponentTarget,
    FingerprintArtifact as Fingerprint, FocusBundle, FocusEntrypoint, FocusFile, MatchedTarget,
    ModernitySignal, PipelineSummary, Provenance, RecommendationSummary, RepoSummary, SearchHints,
    TargetSet, ValidationResult, ValidationSummary,
};

use crate::error::{Result, ScoutError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Canonical component kinds the scanner recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    McpServer,
    Cli,
    Skill,
    Hook,
    Plugin,
    Library,
}

impl TargetKind {
    pub const ALL: [TargetKind; 6] = [
        TargetKind::McpServer,
        TargetKind::Cli,
        TargetKind::Skill,
        TargetKind::Hook,
        TargetKind::Plugin,
        TargetKind::Library,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::McpServer => "mcp-server",
            TargetKind::Cli => "cli",
            TargetKind::Skill => "skill",
            TargetKind::Hook => "hook",
            TargetKind::Plugin => "plugin",
            TargetKind::Library => "library",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "mcp-server" => Ok(TargetKind::McpServer),
            "cli" => Ok(TargetKind::Cli),
            "skill" => Ok(TargetKind::Skill),
            "hook" => Ok(TargetKind::Hook),
            "plugin" => Ok(TargetKind::Plugin),
            "library" => Ok(TargetKind::Library),
            other => Err(format!("unknown target kind '{other}'")),
        }
    }
}

/// A persisted artifact that knows how to check its own invariants.
pub trait Artifact: Serialize + DeserializeOwned {
    /// Human label used in validation error messages.
    const NAME: &'static str;

    fn validate(&self) -> std::result::Result<(), String>;
}

/// Serialize, validate, and write an artifact as pretty JSON.
pub fn write_artifact<A: Artifact>(path: &Path, artifact: &A) -> Result<()> {
    artifact.validate().map_err(|reason| ScoutError::ArtifactInvalid {
        path: path.to_path_buf(),
        reason: format!("{}: {reason}", A::NAME),
    })?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(artifact)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read an artifact and validate it; any failure is `ArtifactInvalid`.
pub fn read_artifact<A: Artifact>(path: &Path) -> Result<A> {
    let raw = std::fs::read_to_string(path).map_err(|err| ScoutError::ArtifactInvalid {
        path: path.to_path_buf(),
        reason: format!("{}: unreadable: {err}", A::NAME),
    })?;
    let artifact: A = serde_json::from_str(&raw).map_err(|err| ScoutError::ArtifactInvalid {
        path: path.to_path_buf(),
        reason: format!("{}: malformed JSON: {err}", A::NAME),
    })?;
    artifact.validate().map_err(|reason| ScoutError::ArtifactInvalid {
        path: path.to_path_buf(),
        reason: format!("{}: {reason}", A::NAME),
    })?;
    Ok(artifact)
}

pub(crate) fn check_score(label: &str, value: f64) -> std::result::Result<(), String> {
    if !(0.0..=1.0).contains(&value) || !value.is_finite() {
        return Err(format!("{label} {value} outside [0,1]"));
    }
    Ok(())
}

pub(crate) fn check_timestamp(label: &str, value: &str) -> std::result::Result<(), String> {
    if chrono::DateTime::parse_from_rfc3339(value).is_err() {
        return Err(format!("{label} '{value}' is not an ISO-8601 timestamp"));
    }
    Ok(())
}

pub(crate) fn check_url(label: &str, value: &str) -> std::result::Result<(), String> {
    if !value.starts_with("https://") && !value.starts_with("http://") && !value.starts_with("git@")
    {
        return Err(format!("{label} '{value}' is not a URL"));
    }
    Ok(())
}

pub(crate) fn check_repo_id(label: &str, value: &str) -> std::result::Result<(), String> {
    let mut parts = value.splitn(2, '/');
    match (parts.next(), parts.next()) {
        (Some(owner), Some(name)) if !owner.is_empty() && !name.is_empty() => Ok(()),
        _ => Err(format!("{label} '{value}' is not of the form owner/name")),
    }
}
