//! Canonical path keys for the cache.
//!
//! Cache rows are keyed by the fully resolved form of a path, so two
//! differently spelled paths to the same file collapse to one key. On top of
//! `fs::canonicalize`, the string form is normalized to Unicode NFC:
//! macOS reports NFD (decomposed) file names while Linux and Windows
//! typically use NFC, and without this step the same visual path could
//! produce two different cache keys.

use std::path::{Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

/// Resolve a path to its canonical form (symlinks and relative components
/// removed).
///
/// Falls back to the input path when resolution fails (e.g. the file has
/// disappeared mid-run); the caller still gets a usable, stable key.
#[must_use]
pub fn canonicalize_lossy(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Derive the cache-key string for a path: canonical form, NFC-normalized.
#[must_use]
pub fn cache_key(path: &Path) -> String {
    let canonical = canonicalize_lossy(path);
    canonical.to_string_lossy().nfc().collect()
}
