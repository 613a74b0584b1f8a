//! Perceptual image hashing and fingerprint comparison.
//!
//! This module provides the [`FingerprintHasher`] which computes fixed-length
//! bit-vector fingerprints for images that remain stable under common
//! transformations like resizing and re-compression, and the [`Fingerprint`]
//! type which carries the bits together with the file identity they were
//! computed from.
//!
//! # Comparison rules
//!
//! Two fingerprints are comparable only when they were produced with the same
//! algorithm and the same hash size; the cache key and the per-run
//! configuration guarantee this throughout the crate.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use image_hasher::{HashAlg, HasherConfig, ImageHash};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Supported perceptual hashing algorithms.
///
/// The string keys (`average`, `perceptual`, ...) are stable: they are what
/// the CLI accepts and what the hash cache stores in its `algorithm` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// aHash (Average Hash) - mean-based, fast, good for exact duplicates.
    Average,
    /// pHash (Perceptual Hash) - DCT-based, most resilient to transformations.
    #[default]
    Perceptual,
    /// dHash (Difference Hash) - gradient-based, very fast and effective.
    Difference,
    /// Blockhash - block mean value hash, robust against scaling.
    Blockhash,
}

impl HashAlgorithm {
    /// Stable string key used as the CLI value and the cache column value.
    #[must_use]
    pub fn as_key(&self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::Perceptual => "perceptual",
            Self::Difference => "difference",
            Self::Blockhash => "blockhash",
        }
    }

    /// Parse a stable string key back into an algorithm.
    ///
    /// Returns `None` for unknown keys (e.g. a cache row written by a newer
    /// version); callers treat that as a cache miss.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "average" => Some(Self::Average),
            "perceptual" => Some(Self::Perceptual),
            "difference" => Some(Self::Difference),
            "blockhash" => Some(Self::Blockhash),
            _ => None,
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_key())
    }
}

/// Errors that can occur while fingerprinting a single image.
#[derive(Debug, Error)]
pub enum HashError {
    /// Failed to open or decode the image.
    #[error("Failed to load image {0}: {1}")]
    Load(PathBuf, #[source] image::ImageError),

    /// Failed to read the file from disk.
    #[error("I/O error for {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
}

/// A perceptual fingerprint of one image, plus the file identity it was
/// computed from.
///
/// Immutable once created. `file_size` and `mtime_ns` are the values observed
/// when the fingerprint was computed and are what the cache validates against
/// on later runs.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    /// Canonical path of the fingerprinted image.
    pub path: PathBuf,
    /// The fingerprint bits.
    pub hash: ImageHash,
    /// Algorithm that produced the bits.
    pub algorithm: HashAlgorithm,
    /// File size in bytes at computation time.
    pub file_size: u64,
    /// Modification time in nanoseconds since the Unix epoch at computation time.
    pub mtime_ns: i64,
}

impl Fingerprint {
    /// Total number of bits in the fingerprint.
    #[must_use]
    pub fn total_bits(&self) -> u32 {
        (self.hash.as_bytes().len() * 8) as u32
    }

    /// Hamming distance to another fingerprint (0 = identical).
    ///
    /// Only meaningful when both fingerprints were produced with the same
    /// algorithm and hash size.
    #[must_use]
    pub fn distance(&self, other: &Fingerprint) -> u32 {
        self.hash.dist(&other.hash)
    }

    /// Similarity percentage to another fingerprint (100.0 = identical).
    ///
    /// Floors at 0.0 for maximally different fingerprints, never negative.
    #[must_use]
    pub fn similarity_pct(&self, other: &Fingerprint) -> f64 {
        let total_bits = f64::from(self.total_bits().max(1));
        let dist = f64::from(self.distance(other));
        (1.0 - dist / total_bits).max(0.0) * 100.0
    }
}

/// Computes perceptual fingerprints for images.
///
/// Construct once per run and share across worker threads; hashing itself
/// is `&self`.
pub struct FingerprintHasher {
    hasher: image_hasher::Hasher,
    algorithm: HashAlgorithm,
}

impl FingerprintHasher {
    /// Create a hasher for the given algorithm and hash size.
    ///
    /// `hash_size` is the side length of the fingerprint grid: the resulting
    /// bit vector has `hash_size * hash_size` bits.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, hash_size: u32) -> Self {
        let mut config = HasherConfig::new().hash_size(hash_size, hash_size);

        match algorithm {
            HashAlgorithm::Average => {
                config = config.hash_alg(HashAlg::Mean);
            }
            HashAlgorithm::Perceptual => {
                config = config.hash_alg(HashAlg::Median).preproc_dct();
            }
            HashAlgorithm::Difference => {
                config = config.hash_alg(HashAlg::Gradient);
            }
            HashAlgorithm::Blockhash => {
                config = config.hash_alg(HashAlg::Blockhash);
            }
        }

        Self {
            hasher: config.to_hasher(),
            algorithm,
        }
    }

    /// Get the algorithm used by this hasher.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Compute the fingerprint for an image at the given path.
    ///
    /// `file_size` and `mtime_ns` are the pre-fetched metadata for the file;
    /// they are recorded in the returned [`Fingerprint`] so the cache entry
    /// written from it matches what was on disk when the bits were computed.
    pub fn fingerprint(
        &self,
        path: &Path,
        file_size: u64,
        mtime_ns: i64,
    ) -> Result<Fingerprint, HashError> {
        let img = image::open(path).map_err(|e| HashError::Load(path.to_path_buf(), e))?;

        Ok(Fingerprint {
            path: path.to_path_buf(),
            hash: self.hasher.hash_image(&img),
            algorithm: self.algorithm,
            file_size,
            mtime_ns,
        })
    }
}
