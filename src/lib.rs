//! PhotoFind - Similar Image Finder
//!
//! A cross-platform CLI that searches a directory tree for images similar to
//! a reference image using perceptual hashing. Fingerprints and directory
//! listings are cached in SQLite so repeat searches over unchanged trees
//! skip both the walk and the re-hashing.

use std::sync::Arc;

use bytesize::ByteSize;

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod hashing;
pub mod logging;
pub mod progress;
pub mod scanner;
pub mod search;
pub mod signal;

use crate::cli::Cli;
use crate::error::ExitCode;
use crate::progress::{Progress, ProgressCallback};
use crate::search::{SearchOutcome, SimilaritySearch};

/// Run the application with parsed CLI arguments.
///
/// Initializes logging and the signal handler, runs the search, renders the
/// results (text or JSON), and returns the exit code. Fatal search errors
/// propagate as `anyhow` errors for `main` to map.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    let handler = signal::install_handler()?;

    let config = cli.to_search_config();
    let mut search = SimilaritySearch::new(config).with_shutdown_flag(handler.get_flag());

    // Progress bars would corrupt JSON output and are pointless when quiet.
    if !cli.no_progress && !cli.json && !cli.quiet {
        let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::new(false));
        search = search.with_progress_callback(progress);
    }

    let outcome = search.run(&cli.image, &cli.directory)?;

    if cli.json {
        print_json(&outcome)?;
    } else if !cli.quiet {
        print_text(&outcome, cli.threshold);
    }

    Ok(if outcome.stats.interrupted {
        ExitCode::Interrupted
    } else if outcome.matches.is_empty() {
        ExitCode::NoMatches
    } else {
        ExitCode::Success
    })
}

/// Render the outcome as a JSON payload on stdout.
fn print_json(outcome: &SearchOutcome) -> anyhow::Result<()> {
    let payload = serde_json::json!({
        "matches": outcome.matches,
        "stats": outcome.stats,
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

/// Render the outcome as human-readable text on stdout.
fn print_text(outcome: &SearchOutcome, threshold: f64) {
    if outcome.matches.is_empty() {
        println!("\nNo matches found with the configured threshold.");
        println!("Try lowering the threshold (current: {threshold}%).");
    } else {
        println!("\n{} match(es) found:\n", outcome.matches.len());
        for (i, m) in outcome.matches.iter().enumerate() {
            println!("  [{}] {}", i + 1, m.candidate.display());
            println!(
                "      Similarity: {:.1}% | Hamming distance: {} | Size: {}",
                m.similarity_pct,
                m.distance,
                ByteSize(m.file_size)
            );
        }
    }

    let stats = &outcome.stats;
    let rate = stats.images_hashed as f64 / stats.elapsed_seconds.max(0.001);
    println!("\n{}", "─".repeat(60));
    println!("Search statistics");
    println!("{}", "─".repeat(60));
    println!("  Image files found    : {}", stats.total_files);
    println!("  Images processed     : {}", stats.images_hashed);
    println!("  Images failed        : {}", stats.images_failed);
    println!("  Cache hits           : {}", stats.cache_hits);
    println!("  Matches found        : {}", stats.matches_found);
    println!("  Total time           : {:.2}s", stats.elapsed_seconds);
    println!("  Speed                : {rate:.0} img/s");
    if stats.interrupted {
        println!("  (interrupted — partial results)");
    }
    println!("{}", "─".repeat(60));
}
