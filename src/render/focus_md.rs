//! Human-oriented markdown companions for focus bundles.

use crate::domain::{FocusBundle, Provenance};
use std::fmt::Write as _;

/// FOCUS.md: where to start reading a repository.
pub fn render_focus_markdown(bundle: &FocusBundle) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Focus: {}", bundle.id);
    let _ = writeln!(out);
    let _ = writeln!(out, "## Entrypoints");
    let _ = writeln!(out);
    if bundle.entrypoints.is_empty() {
        let _ = writeln!(out, "(none resolved)");
    }
    for entry in &bundle.entrypoints {
        let _ = writeln!(out, "- `{}` - {} ({})", entry.path, entry.kind, entry.reason);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "## Scope roots");
    let _ = writeln!(out);
    for root in &bundle.scope_roots {
        let _ = writeln!(out, "- `{root}`");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "## Files ({} selected, smallest first)", bundle.files.len());
    let _ = writeln!(out);
    for file in &bundle.files {
        let _ = writeln!(out, "- `{}` ({} bytes)", file.path, file.size_bytes);
    }
    out
}

/// RUN_HINTS.md: how to drive the bundle contents in a review.
pub fn render_run_hints(bundle: &FocusBundle) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Run hints for {}", bundle.id);
    let _ = writeln!(out);
    let _ = writeln!(out, "Read entrypoints in listed order; each was chosen for a detected");
    let _ = writeln!(out, "component kind. Files are listed smallest first so cheap context");
    let _ = writeln!(out, "loads before large modules.");
    let _ = writeln!(out);
    for entry in &bundle.entrypoints {
        let _ = writeln!(out, "1. `{}` ({})", entry.path, entry.kind);
    }
    out
}

/// PROVENANCE.md rendering of the JSON record.
pub fn render_provenance_markdown(provenance: &Provenance) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Provenance");
    let _ = writeln!(out);
    let _ = writeln!(out, "- Repository: {}", provenance.id);
    let _ = writeln!(out, "- URL: {}", provenance.url);
    let _ = writeln!(out, "- Commit: {}", provenance.commit);
    let _ = writeln!(
        out,
        "- License: {}",
        provenance.license.as_deref().unwrap_or("unknown")
    );
    let _ = writeln!(out, "- Tier-1 score: {:.2}", provenance.tier1_score);
    let _ = writeln!(out, "- Tier-2 score: {:.2}", provenance.tier2_score);
    let _ = writeln!(out, "- Tool: repo-scout {}", provenance.tool_version);
    let _ = writeln!(out, "- Run: {}", provenance.run_id);
    let _ = writeln!(out, "- Generated: {}", provenance.timestamp);
    out
}

/// focus-index.md: one line per bundled repository.
pub fn render_focus_index(bundles: &[FocusBundle]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Focus index");
    let _ = writeln!(out);
    for bundle in bundles {
        let _ = writeln!(
            out,
            "- {} - {} entrypoints, {} files",
            bundle.id,
            bundle.entrypoints.len(),
            bundle.files.len()
        );
    }
    out
}
