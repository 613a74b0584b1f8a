//! Command-line interface definitions.
//!
//! All CLI arguments are defined here using the clap derive API.
//!
//! # Example
//!
//! ```bash
//! # Find images similar to photo.jpg under ~/Pictures
//! photofind photo.jpg ~/Pictures
//!
//! # Faster, looser search with the average hash
//! photofind photo.jpg ~/Pictures -a average -t 80
//!
//! # Scripting: JSON output, no cache
//! photofind photo.jpg ~/Pictures --json --no-cache
//!
//! # Verbose mode for debugging
//! photofind -v photo.jpg ~/Pictures
//! ```

use clap::Parser;
use std::path::PathBuf;

use crate::config::SearchConfig;
use crate::hashing::HashAlgorithm;

/// Find images similar to a reference image.
///
/// Recursively searches a directory for images matching a reference image
/// using perceptual hashing, with a persistent cache so repeat searches
/// skip unchanged files.
#[derive(Debug, Parser)]
#[command(name = "photofind")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the reference image
    #[arg(value_name = "IMAGE")]
    pub image: PathBuf,

    /// Base directory to search recursively
    #[arg(value_name = "DIRECTORY")]
    pub directory: PathBuf,

    /// Hash algorithm to use
    #[arg(short, long, value_enum, default_value_t = HashAlgorithm::Perceptual)]
    pub algorithm: HashAlgorithm,

    /// Minimum similarity percentage (0-100)
    #[arg(short = 't', long, value_name = "PCT", default_value_t = 90.0)]
    pub threshold: f64,

    /// Hash grid side length (one of 8, 16, 32, 64; larger = more precise, slower)
    #[arg(long, value_name = "N", default_value = "16", value_parser = parse_hash_size)]
    pub hash_size: u32,

    /// Prefilter candidates by file size, as a percent of the reference size
    #[arg(long, value_name = "PCT", default_value_t = 50.0)]
    pub size_tolerance: f64,

    /// Disable the file-size prefilter
    #[arg(long)]
    pub no_size_filter: bool,

    /// Number of files per hashing batch
    #[arg(long, value_name = "N", default_value_t = 500)]
    pub batch_size: usize,

    /// Number of parallel hashing workers (0 = one per logical core)
    #[arg(short = 'w', long, value_name = "N", default_value_t = 0)]
    pub workers: usize,

    /// Number of I/O threads for metadata collection
    #[arg(long, value_name = "N", default_value_t = 16)]
    pub io_workers: usize,

    /// Path to the SQLite cache database (default: platform cache dir)
    #[arg(long, value_name = "PATH")]
    pub cache_db: Option<PathBuf>,

    /// Disable the persistent hash cache
    #[arg(long)]
    pub no_cache: bool,

    /// Disable the cached directory index
    #[arg(long)]
    pub no_dir_index: bool,

    /// Force a fresh directory walk and rewrite the index
    #[arg(long)]
    pub refresh_dir_index: bool,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Build the search configuration from the parsed arguments.
    #[must_use]
    pub fn to_search_config(&self) -> SearchConfig {
        SearchConfig {
            algorithm: self.algorithm,
            hash_size: self.hash_size,
            threshold_pct: self.threshold,
            workers: self.workers,
            io_workers: self.io_workers,
            batch_size: self.batch_size,
            use_cache: !self.no_cache,
            cache_db_path: self.cache_db.clone(),
            use_dir_index: !self.no_dir_index,
            refresh_dir_index: self.refresh_dir_index,
            size_tolerance_pct: if self.no_size_filter {
                None
            } else {
                Some(self.size_tolerance)
            },
        }
    }
}

/// Parse and validate the hash size argument.
///
/// Restricted to byte-aligned grid sizes so the fingerprint bit count is
/// exactly `hash_size²`.
fn parse_hash_size(s: &str) -> Result<u32, String> {
    let value: u32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid hash size"))?;
    if matches!(value, 8 | 16 | 32 | 64) {
        Ok(value)
    } else {
        Err(format!("hash size must be one of 8, 16, 32, 64 (got {value})"))
    }
}
