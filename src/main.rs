//! repo-scout: discover, rank, and track comparable open-source projects
//!
//! Fingerprints a local source tree, searches a code-hosting service for
//! structurally similar repositories, clones and validates a budgeted
//! subset, and emits focused context bundles. A watch subsystem tracks
//! repositories across commits and packages hygienic diffs into review
//! sessions.

mod cli;
mod config;
mod discover;
mod domain;
mod error;
mod fetch;
mod focus;
mod infer;
mod rank;
mod remote;
mod render;
mod scan;
mod utils;
mod validate;
mod vcs;
mod watch;

fn main() {
    if let Err(err) = cli::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
