//! Full compare report: ranked table plus per-repo detail sections.

use crate::domain::{
    CompareReport, PipelineSummary, RecommendationSummary, RepoSummary, TargetSet,
    ValidationSummary,
};
use crate::utils::utc_timestamp;
use std::fmt::Write as _;

/// Assemble the report artifact from validation output.
pub fn build_report(
    run_id: &str,
    source: &TargetSet,
    summary: &ValidationSummary,
    discovered: usize,
    cloned: usize,
) -> CompareReport {
    let mut ranked: Vec<RepoSummary> = summary
        .results
        .iter()
        .map(|result| RepoSummary {
            id: result.id.clone(),
            tier2_score: result.tier2_score,
            tier1_score: result.tier1_score,
            structural_count: result.structural_count,
            modernity_score: result.modernity_score,
            matched_kinds: result.matches.iter().map(|m| m.kind).collect(),
            description: None,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.tier2_score
            .partial_cmp(&a.tier2_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.tier1_score.partial_cmp(&a.tier1_score).unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.id.cmp(&b.id))
    });

    let top_recommendation = ranked
        .first()
        .map(|top| RecommendationSummary { id: top.id.clone(), tier2_score: top.tier2_score });

    CompareReport {
        run_id: run_id.to_string(),
        timestamp: utc_timestamp(),
        source: source.clone(),
        ranked,
        pipeline: PipelineSummary {
            discovered,
            cloned,
            validated: summary.results.len(),
            top_recommendation,
        },
    }
}

/// REPORT.md: the human-oriented full report.
pub fn render_report_markdown(report: &CompareReport, summary: &ValidationSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Repo Scout Report");
    let _ = writeln!(out);
    let _ = writeln!(out, "Run `{}` at {}", report.run_id, report.timestamp);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Pipeline: {} discovered, {} cloned, {} validated.",
        report.pipeline.discovered, report.pipeline.cloned, report.pipeline.validated
    );
    let _ = writeln!(out);

    match &report.pipeline.top_recommendation {
        Some(top) => {
            let _ = writeln!(out, "**Top recommendation:** {} (tier-2 {:.2})", top.id, top.tier2_score);
        }
        None => {
            let _ = writeln!(out, "**Top recommendation:** none - no candidates survived filtering.");
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Ranking");
    let _ = writeln!(out);
    let _ = writeln!(out, "| # | Repository | Tier-2 | Tier-1 | Kinds | Modernity |");
    let _ = writeln!(out, "|---|------------|--------|--------|-------|-----------|");
    for (index, repo) in report.ranked.iter().enumerate() {
        let kinds: Vec<&str> = repo.matched_kinds.iter().map(|k| k.as_str()).collect();
        let _ = writeln!(
            out,
            "| {} | {} | {:.2} | {:.2} | {} | {:.2} |",
            index + 1,
            repo.id,
            repo.tier2_score,
            repo.tier1_score,
            kinds.join(", "),
            repo.modernity_score
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Details");
    for result in &summary.results {
        let _ = writeln!(out);
        let _ = writeln!(out, "### {}", result.id);
        let _ = writeln!(out);
        for matched in &result.matches {
            let _ = writeln!(out, "- **{}**: {}", matched.kind, matched.evidence.join("; "));
            if !matched.focus_roots.is_empty() {
                let _ = writeln!(out, "  - scope: {}", matched.focus_roots.join(", "));
            }
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Modernity {:.2}:", result.modernity_score);
        for signal in &result.modernity {
            let mark = if signal.passed { "x" } else { " " };
            match &signal.detail {
                Some(detail) => {
                    let _ = writeln!(out, "- [{mark}] {} ({detail})", signal.name);
                }
                None => {
                    let _ = writeln!(out, "- [{mark}] {}", signal.name);
                }
            }
        }
    }
    out
}
