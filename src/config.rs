//! Search run configuration.
//!
//! [`SearchConfig`] carries every knob the orchestrator consumes: algorithm,
//! hash size, threshold, pool widths, batching, and cache behavior. The CLI
//! builds one from arguments; tests build one with the `with_*` methods.

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::hashing::HashAlgorithm;

/// Default hash grid side length (fingerprints of 16x16 = 256 bits).
pub const DEFAULT_HASH_SIZE: u32 = 16;

/// Default minimum similarity percentage for a match.
pub const DEFAULT_THRESHOLD_PCT: f64 = 90.0;

/// Default number of stat-collector threads.
pub const DEFAULT_IO_WORKERS: usize = 16;

/// Default number of files per hashing batch.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Default size prefilter tolerance, in percent of the reference size.
pub const DEFAULT_SIZE_TOLERANCE_PCT: f64 = 50.0;

/// Configuration for one similarity search run.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Perceptual hash algorithm to use.
    pub algorithm: HashAlgorithm,
    /// Hash grid side length; the fingerprint has `hash_size²` bits.
    pub hash_size: u32,
    /// Minimum similarity percentage (inclusive) for a match.
    pub threshold_pct: f64,
    /// CPU hashing workers; 0 means one per logical core.
    pub workers: usize,
    /// Stat-collector threads (I/O overlap only, not CPU parallelism).
    pub io_workers: usize,
    /// Files per hashing batch; results are flushed to the cache per batch.
    pub batch_size: usize,
    /// Whether to use the persistent hash cache.
    pub use_cache: bool,
    /// Cache database path; `None` selects the platform default.
    pub cache_db_path: Option<PathBuf>,
    /// Whether to reuse cached directory listings.
    pub use_dir_index: bool,
    /// Force a fresh directory walk even if the index looks valid.
    pub refresh_dir_index: bool,
    /// Size prefilter tolerance in percent of the reference file size;
    /// `None` disables the prefilter.
    pub size_tolerance_pct: Option<f64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            hash_size: DEFAULT_HASH_SIZE,
            threshold_pct: DEFAULT_THRESHOLD_PCT,
            workers: 0,
            io_workers: DEFAULT_IO_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
            use_cache: true,
            cache_db_path: None,
            use_dir_index: true,
            refresh_dir_index: false,
            size_tolerance_pct: Some(DEFAULT_SIZE_TOLERANCE_PCT),
        }
    }
}

impl SearchConfig {
    /// Set the hash algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the hash grid side length.
    #[must_use]
    pub fn with_hash_size(mut self, hash_size: u32) -> Self {
        self.hash_size = hash_size.max(1);
        self
    }

    /// Set the similarity threshold percentage.
    #[must_use]
    pub fn with_threshold(mut self, threshold_pct: f64) -> Self {
        self.threshold_pct = threshold_pct;
        self
    }

    /// Set the number of CPU hashing workers (0 = auto).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the hashing batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Use an explicit cache database path.
    #[must_use]
    pub fn with_cache_path(mut self, path: PathBuf) -> Self {
        self.use_cache = true;
        self.cache_db_path = Some(path);
        self
    }

    /// Disable the persistent cache entirely.
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    /// Set or disable the size prefilter tolerance.
    #[must_use]
    pub fn with_size_tolerance(mut self, tolerance_pct: Option<f64>) -> Self {
        self.size_tolerance_pct = tolerance_pct;
        self
    }

    /// Number of CPU hashing workers to actually start.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(4)
        }
    }

    /// Number of stat-collector threads to actually start.
    #[must_use]
    pub fn effective_io_workers(&self) -> usize {
        if self.io_workers > 0 {
            self.io_workers
        } else {
            DEFAULT_IO_WORKERS
        }
    }

    /// Batch size, guarded against zero.
    #[must_use]
    pub fn effective_batch_size(&self) -> usize {
        if self.batch_size > 0 {
            self.batch_size
        } else {
            DEFAULT_BATCH_SIZE
        }
    }

    /// The cache database path for this run, or `None` when caching is off.
    #[must_use]
    pub fn resolve_cache_path(&self) -> Option<PathBuf> {
        if !self.use_cache {
            return None;
        }
        self.cache_db_path.clone().or_else(default_cache_path)
    }
}

/// Platform-default cache database location.
///
/// XDG cache dir on Linux, `Library/Caches` on macOS, `AppData\Local` on
/// Windows.
#[must_use]
pub fn default_cache_path() -> Option<PathBuf> {
    let dirs = ProjectDirs::from("com", "photofind", "photofind")?;
    Some(dirs.cache_dir().join("hashes.sqlite3"))
}
