//! Report and digest rendering.

mod digest;
mod focus_md;
mod report;

pub use digest::render_digest;
pub use focus_md::{render_focus_index, render_focus_markdown, render_provenance_markdown, render_run_hints};
pub use report::{build_report, render_report_markdown};
