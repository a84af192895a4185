//! Command-line interface for repo-scout
//!
//! Six stable pipeline commands (scan, discover, clone, validate, focus,
//! compare) and the experimental watch/review surface.

use anyhow::Result;
use clap::{Parser, Subcommand};
use once_cell::sync::Lazy;
use std::collections::BTreeSet;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod compare;
mod discover;
mod fetch;
mod focus;
mod review;
mod scan;
mod utils;
mod validate;
mod watch;

/// Discover, rank, and track comparable repositories for focused review
#[derive(Parser)]
#[command(name = "scout")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fingerprint a source tree and infer component targets
    Scan(scan::ScanArgs),

    /// Search the remote host for comparable repositories
    Discover(discover::DiscoverArgs),

    /// Shallow-fetch the top candidates into the repo cache
    Clone(fetch::CloneArgs),

    /// Detect component kinds and audit modernity in cloned repos
    Validate(validate::ValidateArgs),

    /// Emit focus bundles with entrypoints and provenance
    Focus(focus::FocusArgs),

    /// Run the whole pipeline and produce the compare report
    Compare(compare::CompareArgs),

    /// Track a repository for longitudinal review (experimental)
    Track(watch::TrackArgs),

    /// Manage tracked repositories (experimental)
    Watch(watch::WatchArgs),

    /// Build a review session for a commit range (experimental)
    Session(review::SessionArgs),

    /// Validate and launch a review session (experimental)
    Review(review::ReviewArgs),
}

static EXPERIMENTAL_WARNED: Lazy<Mutex<BTreeSet<&'static str>>> =
    Lazy::new(|| Mutex::new(BTreeSet::new()));

/// Print the experimental warning once per command name per process.
pub(crate) fn warn_experimental(command: &'static str) {
    let mut warned = EXPERIMENTAL_WARNED.lock().expect("warning set poisoned");
    if warned.insert(command) {
        eprintln!("warning: '{command}' is experimental; behavior and storage may change");
    }
}

pub fn run() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Invocation errors exit 1; help/version print and exit 0.
            err.print().ok();
            let code = if err.use_stderr() { 1 } else { 0 };
            std::process::exit(code);
        }
    };

    // RUST_LOG always wins; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    match cli.command {
        Commands::Scan(args) => scan::run(args),
        Commands::Discover(args) => discover::run(args),
        Commands::Clone(args) => fetch::run(args),
        Commands::Validate(args) => validate::run(args),
        Commands::Focus(args) => focus::run(args),
        Commands::Compare(args) => compare::run(args),
        Commands::Track(args) => watch::run_track(args),
        Commands::Watch(args) => watch::run_watch(args),
        Commands::Session(args) => review::run_session(args),
        Commands::Review(args) => review::run_review(args),
    }
}
