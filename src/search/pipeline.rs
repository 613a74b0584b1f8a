//! CPU-bound hashing pipeline.
//!
//! Files that missed the cache are fingerprinted on a dedicated rayon pool,
//! in fixed-size batches. Each batch is flushed to the cache as soon as it
//! completes, which bounds memory growth and limits lost work if the run is
//! interrupted. The shutdown flag is polled only here, between batches —
//! worker closures never inspect it, so the pool always drains cleanly and
//! whatever finished before the interrupt is returned (and already
//! persisted if its batch had been flushed).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};

use rayon::prelude::*;

use crate::cache::HashCache;
use crate::hashing::{Fingerprint, FingerprintHasher};
use crate::progress::ProgressCallback;
use crate::scanner::FileMeta;

/// One unit of hashing work: a path plus its pre-fetched metadata.
#[derive(Debug, Clone)]
pub struct HashTask {
    /// Canonical path of the file to fingerprint.
    pub path: PathBuf,
    /// Size and mtime observed by the stat collector.
    pub meta: FileMeta,
}

/// Configuration for the hashing pipeline.
#[derive(Clone)]
pub struct PipelineConfig {
    /// Number of CPU worker threads.
    pub workers: usize,
    /// Number of files per batch; the cache is flushed after each batch.
    pub batch_size: usize,
    /// Optional shutdown flag, polled between batches.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("workers", &self.workers)
            .field("batch_size", &self.batch_size)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a pipeline configuration with the given pool and batch sizes.
    #[must_use]
    pub fn new(workers: usize, batch_size: usize) -> Self {
        Self {
            workers: workers.max(1),
            batch_size: batch_size.max(1),
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Set the shutdown flag for cooperative cancellation.
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

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// What came out of a pipeline run.
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    /// Successfully computed fingerprints, in completion order.
    pub fingerprints: Vec<Fingerprint>,
    /// Number of files that failed to decode or hash.
    pub failed: usize,
    /// Whether the run stopped early on the shutdown flag.
    pub interrupted: bool,
}

/// Fingerprint every task, flushing each completed batch to the cache.
///
/// Per-file failures are counted and skipped, never fatal. When the
/// shutdown flag is set between batches, dispatch stops and everything
/// already computed is returned with `interrupted = true`.
///
/// No pool is started when `tasks` is empty.
#[must_use]
pub fn hash_missing(
    tasks: &[HashTask],
    hasher: &FingerprintHasher,
    hash_size: u32,
    mut cache: Option<&mut HashCache>,
    config: &PipelineConfig,
) -> PipelineOutcome {
    let mut outcome = PipelineOutcome::default();
    if tasks.is_empty() {
        return outcome;
    }

    if let Some(cb) = &config.progress_callback {
        cb.on_phase_start("hashing", tasks.len());
    }
    log::info!(
        "Hashing {} files on {} workers (batches of {})",
        tasks.len(),
        config.workers,
        config.batch_size
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.max(1))
        .build()
        .ok();
    let processed = AtomicUsize::new(0);

    for batch in tasks.chunks(config.batch_size.max(1)) {
        if config.is_shutdown_requested() {
            log::info!(
                "Hashing interrupted; {} of {} files not dispatched",
                tasks.len() - outcome.fingerprints.len() - outcome.failed,
                tasks.len()
            );
            outcome.interrupted = true;
            break;
        }

        let (tx, rx) = mpsc::channel();
        let run_batch = || {
            batch.par_iter().for_each_with(tx, |tx, task| {
                let result = hasher.fingerprint(&task.path, task.meta.size, task.meta.mtime_ns);
                let current = processed.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(cb) = &config.progress_callback {
                    cb.on_progress(current, task.path.to_string_lossy().as_ref());
                }
                let _ = tx.send(result);
            });
        };
        match &pool {
            Some(pool) => pool.install(run_batch),
            None => run_batch(),
        }

        // Drain in completion order; all senders are gone once the batch
        // returns, so this never blocks.
        let mut batch_done = Vec::new();
        for result in rx {
            match result {
                Ok(fp) => batch_done.push(fp),
                Err(e) => {
                    log::warn!("{e}");
                    outcome.failed += 1;
                }
            }
        }

        if let Some(cache) = cache.as_deref_mut() {
            if let Err(e) = cache.upsert_many(&batch_done, hash_size) {
                log::warn!("Failed to flush batch to cache: {e}");
            }
        }
        outcome.fingerprints.extend(batch_done);
    }

    if let Some(cb) = &config.progress_callback {
        cb.on_phase_end("hashing");
    }
    outcome
}
