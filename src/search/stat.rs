//! Concurrent file metadata collection.
//!
//! Stat calls are pure I/O wait; a small dedicated thread pool overlaps
//! them instead of issuing thousands sequentially. This is strictly I/O
//! overlap, not CPU parallelism — the pool is sized independently of the
//! hashing workers.

use std::collections::HashMap;
use std::path::PathBuf;

use rayon::prelude::*;

use crate::scanner::FileMeta;

/// Stat every candidate path on a bounded pool, returning a map of the
/// results.
///
/// Files that cannot be stat'ed are simply absent from the map; the caller
/// treats them as having unknown metadata (excluded from the size
/// prefilter, never a cache hit). Ordering is irrelevant — results are
/// gathered into a map keyed by path.
#[must_use]
pub fn collect_stats(paths: &[PathBuf], io_workers: usize) -> HashMap<PathBuf, FileMeta> {
    if paths.is_empty() {
        return HashMap::new();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(io_workers.max(1))
        .build();

    let stat_all = || -> Vec<(PathBuf, FileMeta)> {
        paths
            .par_iter()
            .filter_map(|path| match FileMeta::of(path) {
                Ok(meta) => Some((path.clone(), meta)),
                Err(e) => {
                    log::debug!("Could not stat {}: {e}", path.display());
                    None
                }
            })
            .collect()
    };

    let pairs = match pool {
        Ok(pool) => pool.install(stat_all),
        Err(e) => {
            log::warn!("Failed to build stat pool, using global pool: {e}");
            stat_all()
        }
    };

    pairs.into_iter().collect()
}
