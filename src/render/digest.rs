//! Compact digest: the report compressed to at most ~2000 characters.

use crate::domain::CompareReport;
use std::fmt::Write as _;

const DIGEST_CHAR_BUDGET: usize = 2000;

/// DIGEST.md content. Names the top recommendation with its score, lists a
/// rank table for alternatives, and carries no methodology prose. Truncates
/// alternatives rather than exceed the character budget.
pub fn render_digest(report: &CompareReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Scout Digest ({})", report.run_id);
    let _ = writeln!(out);

    match &report.pipeline.top_recommendation {
        Some(top) => {
            let _ = writeln!(out, "**Use {}** - tier-2 score {:.2}.", top.id, top.tier2_score);
        }
        None => {
            let _ = writeln!(out, "No candidates survived filtering.");
        }
    }
    let _ = writeln!(out);

    if report.ranked.len() > 1 {
        let _ = writeln!(out, "| # | Alternative | Tier-2 | Kinds |");
        let _ = writeln!(out, "|---|-------------|--------|-------|");
        for (index, repo) in report.ranked.iter().enumerate().skip(1) {
            let kinds: Vec<&str> = repo.matched_kinds.iter().map(|k| k.as_str()).collect();
            let line = format!(
                "| {} | {} | {:.2} | {} |\n",
                index + 1,
                repo.id,
                repo.tier2_score,
                kinds.join(", ")
            );
            if out.len() + line.len() + 32 > DIGEST_CHAR_BUDGET {
                let _ = writeln!(out, "| … | ({} more) | | |", report.ranked.len() - index);
                break;
            }
            out.push_str(&line);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(
        out,
        "{} discovered / {} cloned / {} validated.",
        report.pipeline.discovered, report.pipeline.cloned, report.pipeline.validated
    );
    out
}
