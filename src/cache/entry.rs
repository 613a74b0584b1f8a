//! Cache entry model and freshness validation.

use std::path::PathBuf;

use image_hasher::ImageHash;

use crate::hashing::{Fingerprint, HashAlgorithm};
use crate::scanner::FileMeta;

/// One persisted fingerprint row, as read back from the cache.
///
/// A row is only a valid substitute for recomputation when
/// [`is_fresh`](CachedFingerprint::is_fresh) holds against the file's
/// current metadata; any difference in size or mtime forces a recompute
/// (and a subsequent overwrite of this row).
#[derive(Debug, Clone)]
pub struct CachedFingerprint {
    /// Canonical path the row is keyed by.
    pub path: PathBuf,
    /// Modification time recorded when the hash was computed (ns since epoch).
    pub mtime_ns: i64,
    /// File size in bytes recorded when the hash was computed.
    pub size: u64,
    /// Algorithm that produced the hash.
    pub algorithm: HashAlgorithm,
    /// Hash grid side length the row is partitioned by.
    pub hash_size: u32,
    /// Fingerprint bits, base64-encoded.
    pub hash_base64: String,
    /// Image width, if recorded.
    pub width: Option<u32>,
    /// Image height, if recorded.
    pub height: Option<u32>,
}

impl CachedFingerprint {
    /// Whether this row still describes the file on disk.
    ///
    /// Exact equality on both size and mtime; "close enough" is not fresh.
    #[must_use]
    pub fn is_fresh(&self, current: &FileMeta) -> bool {
        self.size == current.size && self.mtime_ns == current.mtime_ns
    }

    /// Decode the stored bits back into a usable [`Fingerprint`].
    ///
    /// Returns `None` when the stored text does not decode; callers treat
    /// that row as a cache miss and recompute.
    #[must_use]
    pub fn into_fingerprint(self) -> Option<Fingerprint> {
        let hash = ImageHash::from_base64(&self.hash_base64).ok()?;
        Some(Fingerprint {
            path: self.path,
            hash,
            algorithm: self.algorithm,
            file_size: self.size,
            mtime_ns: self.mtime_ns,
        })
    }
}
