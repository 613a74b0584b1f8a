//! Persistent caching for fingerprints and directory listings.
//!
//! This module provides SQLite-backed storage that lets repeat searches skip
//! both the recursive directory walk and the re-hashing of unchanged files.
//!
//! # Architecture
//!
//! The caching system is split into two components:
//!
//! * [`database`]: SQLite persistence, schema management, chunked lookups,
//!   and the transactional directory index.
//! * [`entry`]: The data model stored in the cache and its validation logic.
//!
//! # Cache Invalidation
//!
//! Fingerprint rows are keyed by `(path, algorithm, hash_size)` and are only
//! reused when the stored size AND mtime exactly equal the file's current
//! values; any difference forces recomputation and an overwrite. Directory
//! listings are guarded by a coarse staleness token (the root's own mtime
//! plus the member row count); any mismatch invalidates the whole listing.
//!
//! Caching is a performance optimization, not a correctness requirement: a
//! store that cannot be opened degrades the search to no-cache mode instead
//! of aborting it.

pub mod database;
pub mod entry;

pub use database::{CacheError, CacheResult, HashCache};
pub use entry::CachedFingerprint;
