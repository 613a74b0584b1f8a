//! Similarity search orchestration.
//!
//! # Overview
//!
//! [`SimilaritySearch`] sequences the whole run:
//!
//! 1. **Validate** the reference image and search directory
//! 2. **Fingerprint** the reference
//! 3. **List candidates** — from the directory index cache when its
//!    staleness token holds, otherwise a fresh recursive walk
//! 4. **Stat** all candidates on a bounded I/O pool
//! 5. **Prefilter** by file size around the reference size (optional)
//! 6. **Resolve** the hash cache into {fresh hits, missing}
//! 7. **Hash** the missing set on the CPU pool, flushing per batch
//! 8. **Rank** everything against the reference
//!
//! Only validation and an unhashable reference are fatal. Unreadable
//! candidates become statistics, a broken cache degrades to no-cache mode,
//! and an interrupt returns partial results instead of an error.
//!
//! # Example
//!
//! ```no_run
//! use photofind::config::SearchConfig;
//! use photofind::search::SimilaritySearch;
//! use std::path::Path;
//!
//! let search = SimilaritySearch::new(SearchConfig::default());
//! let outcome = search
//!     .run(Path::new("photo.jpg"), Path::new("/home/user/Pictures"))
//!     .unwrap();
//! println!("{} matches", outcome.matches.len());
//! ```

pub mod pipeline;
pub mod ranker;
pub mod stat;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::cache::HashCache;
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::hashing::{Fingerprint, FingerprintHasher};
use crate::progress::ProgressCallback;
use crate::scanner::path_utils::canonicalize_lossy;
use crate::scanner::{list_image_files, FileMeta};

pub use pipeline::{hash_missing, HashTask, PipelineConfig, PipelineOutcome};
pub use ranker::rank;
pub use stat::collect_stats;

/// A match between the reference image and one candidate.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    /// Canonical path of the reference image.
    pub reference: PathBuf,
    /// Canonical path of the matching candidate.
    pub candidate: PathBuf,
    /// Hamming distance between the two fingerprints (0 = identical).
    pub distance: u32,
    /// Similarity percentage (100.0 = identical).
    pub similarity_pct: f64,
    /// Candidate file size in bytes.
    pub file_size: u64,
}

/// Counters accumulated during one search run.
///
/// Created at run start, mutated only by the orchestrator, read-only once
/// the run returns.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchStats {
    /// Candidate files considered (after the optional size prefilter).
    pub total_files: usize,
    /// Files with a usable fingerprint (computed or cached).
    pub images_hashed: usize,
    /// Files that could not be decoded or hashed.
    pub images_failed: usize,
    /// Fingerprints reused from the cache without recomputation.
    pub cache_hits: usize,
    /// Matches at or above the threshold.
    pub matches_found: usize,
    /// Whether the run was cut short by a shutdown request.
    pub interrupted: bool,
    /// Wall-clock duration of the run in seconds.
    pub elapsed_seconds: f64,
}

/// Everything a search run produces: ranked matches plus statistics.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Matches sorted by descending similarity.
    pub matches: Vec<MatchResult>,
    /// Run statistics.
    pub stats: SearchStats,
}

/// The search orchestrator.
///
/// Owns nothing long-lived: the cache connection and worker pools are
/// created inside [`run`](SimilaritySearch::run) and released on every exit
/// path, including validation failures and interruption.
pub struct SimilaritySearch {
    config: SearchConfig,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl SimilaritySearch {
    /// Create a search with the given configuration.
    #[must_use]
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Set the shutdown flag observed between hashing batches.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Run the search.
    ///
    /// # Errors
    ///
    /// Returns an error only for the fatal cases: missing reference image,
    /// missing search directory, or a reference that cannot be
    /// fingerprinted. Everything else degrades into [`SearchStats`].
    pub fn run(&self, reference: &Path, directory: &Path) -> Result<SearchOutcome, SearchError> {
        let started = Instant::now();

        // Validation happens before any pool or cache is touched.
        if !reference.exists() {
            return Err(SearchError::ReferenceNotFound(reference.to_path_buf()));
        }
        if !directory.is_dir() {
            return Err(SearchError::DirectoryNotFound(directory.to_path_buf()));
        }

        let reference = canonicalize_lossy(reference);
        let ref_meta = FileMeta::of(&reference)
            .map_err(|_| SearchError::ReferenceNotFound(reference.clone()))?;

        let hasher = FingerprintHasher::new(self.config.algorithm, self.config.hash_size);
        let ref_fp = hasher
            .fingerprint(&reference, ref_meta.size, ref_meta.mtime_ns)
            .map_err(|source| SearchError::ReferenceUnhashable {
                path: reference.clone(),
                source,
            })?;
        log::info!(
            "Reference fingerprint: {} ({} bits, {})",
            reference.display(),
            ref_fp.total_bits(),
            self.config.algorithm
        );

        let mut stats = SearchStats::default();

        // The cache is scoped to this call; a store that will not open
        // degrades the run instead of failing it.
        let mut cache: Option<HashCache> = match self.config.resolve_cache_path() {
            Some(path) => match HashCache::open(&path) {
                Ok(cache) => Some(cache),
                Err(e) => {
                    log::warn!("Cache unavailable ({e}); continuing without cache");
                    None
                }
            },
            None => None,
        };

        let candidates = self.list_candidates(directory, cache.as_mut())?;
        let mut candidates = self.normalize_candidates(candidates, &reference);
        stats.total_files = candidates.len();
        log::info!("{} candidate images found", candidates.len());

        if candidates.is_empty() {
            stats.elapsed_seconds = started.elapsed().as_secs_f64();
            return Ok(SearchOutcome {
                matches: Vec::new(),
                stats,
            });
        }

        // Metadata for freshness checks and the size prefilter.
        let stat_map = collect_stats(&candidates, self.config.effective_io_workers());

        if let Some(tolerance_pct) = self.config.size_tolerance_pct {
            let tol = tolerance_pct.max(0.0) / 100.0;
            let min_size = (ref_meta.size as f64 * (1.0 - tol)).max(0.0) as u64;
            let max_size = (ref_meta.size as f64 * (1.0 + tol)) as u64;
            // Files with unknown metadata pass through: the prefilter can't
            // judge them.
            candidates.retain(|path| match stat_map.get(path) {
                Some(meta) => meta.size >= min_size && meta.size <= max_size,
                None => true,
            });
            stats.total_files = candidates.len();
            log::info!(
                "Size filter {min_size}\u{2013}{max_size} bytes: {} candidates remain",
                candidates.len()
            );
        }

        // Split candidates into fresh cache hits and files to hash.
        let cached_map = match cache.as_ref() {
            Some(cache) => cache
                .get_cached(&candidates, self.config.algorithm, self.config.hash_size)
                .unwrap_or_else(|e| {
                    log::warn!("Cache lookup failed ({e}); recomputing all");
                    HashMap::new()
                }),
            None => HashMap::new(),
        };

        let mut cached_results: Vec<Fingerprint> = Vec::new();
        let mut missing: Vec<HashTask> = Vec::new();
        for path in &candidates {
            let meta = stat_map.get(path).copied();
            if let (Some(meta), Some(entry)) = (meta, cached_map.get(path)) {
                if entry.is_fresh(&meta) {
                    if let Some(fp) = entry.clone().into_fingerprint() {
                        cached_results.push(fp);
                        stats.cache_hits += 1;
                        continue;
                    }
                    log::warn!("Discarding undecodable cache row for {}", path.display());
                }
            }
            missing.push(HashTask {
                path: path.clone(),
                meta: meta.unwrap_or(FileMeta {
                    size: 0,
                    mtime_ns: 0,
                }),
            });
        }
        log::info!(
            "{} fingerprints reused from cache, {} to compute",
            cached_results.len(),
            missing.len()
        );

        // Hash whatever is missing, flushing each batch to the cache.
        let mut pipeline_config = PipelineConfig::new(
            self.config.effective_workers(),
            self.config.effective_batch_size(),
        );
        if let Some(flag) = &self.shutdown_flag {
            pipeline_config = pipeline_config.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(callback) = &self.progress_callback {
            pipeline_config = pipeline_config.with_progress_callback(Arc::clone(callback));
        }
        let outcome = hash_missing(
            &missing,
            &hasher,
            self.config.hash_size,
            cache.as_mut(),
            &pipeline_config,
        );
        stats.interrupted = outcome.interrupted;
        stats.images_failed = outcome.failed;

        let mut fingerprints = outcome.fingerprints;
        fingerprints.extend(cached_results);
        stats.images_hashed = fingerprints.len();

        let matches = rank(&ref_fp, &fingerprints, self.config.threshold_pct);
        stats.matches_found = matches.len();
        stats.elapsed_seconds = started.elapsed().as_secs_f64();

        Ok(SearchOutcome { matches, stats })
        // `cache` drops here on every path, closing the connection.
    }

    /// Produce the raw candidate listing, preferring the directory index.
    fn list_candidates(
        &self,
        directory: &Path,
        cache: Option<&mut HashCache>,
    ) -> Result<Vec<PathBuf>, SearchError> {
        if let Some(callback) = &self.progress_callback {
            callback.on_phase_start("scanning", 0);
        }

        let result = self.list_candidates_inner(directory, cache);

        if let Some(callback) = &self.progress_callback {
            callback.on_phase_end("scanning");
        }
        result
    }

    fn list_candidates_inner(
        &self,
        directory: &Path,
        cache: Option<&mut HashCache>,
    ) -> Result<Vec<PathBuf>, SearchError> {
        let use_index = self.config.use_dir_index;

        if let Some(cache) = &cache {
            if use_index && !self.config.refresh_dir_index {
                if let Some(listing) = cache.get_index(directory) {
                    log::info!("Using cached directory index ({} paths)", listing.len());
                    return Ok(listing);
                }
            }
        }

        let listing = list_image_files(directory)
            .map_err(|_| SearchError::DirectoryNotFound(directory.to_path_buf()))?;

        if let Some(cache) = cache {
            if use_index {
                if let Err(e) = cache.replace_index(directory, &listing) {
                    log::warn!("Could not store directory index: {e}");
                }
            }
        }
        Ok(listing)
    }

    /// Canonicalize, deduplicate, and drop the reference from the listing.
    fn normalize_candidates(&self, listing: Vec<PathBuf>, reference: &Path) -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = listing
            .iter()
            .map(|p| canonicalize_lossy(p))
            .filter(|p| p != reference)
            .collect();
        candidates.sort();
        candidates.dedup();
        candidates
    }
}
