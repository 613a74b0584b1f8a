//! Scanner module for discovering candidate image files.
//!
//! This module provides functionality for:
//! - Parallel recursive traversal using jwalk
//! - Filtering by a fixed, case-insensitive image extension allow-list
//! - Canonical cache-key derivation for paths
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and image file discovery
//! - [`path_utils`]: Canonical path/key normalization
//!
//! # Example
//!
//! ```no_run
//! use photofind::scanner::list_image_files;
//! use std::path::Path;
//!
//! let files = list_image_files(Path::new("/home/user/Pictures")).unwrap();
//! println!("{} candidate images", files.len());
//! ```

pub mod path_utils;
pub mod walker;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub use walker::{list_image_files, Walker};

/// File extensions considered images, compared case-insensitively.
///
/// Matches the formats the bundled decoder can actually open; anything else
/// is skipped during traversal rather than failing later in the pipeline.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "bmp", "gif", "tiff", "tif", "webp",
];

/// Check whether a path has an image extension from the allow-list.
#[must_use]
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

/// Size and modification time of one file, captured at a single stat call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    /// File size in bytes.
    pub size: u64,
    /// Modification time in nanoseconds since the Unix epoch.
    pub mtime_ns: i64,
}

impl FileMeta {
    /// Stat a file and capture its size and mtime.
    pub fn of(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        let modified = meta.modified()?;
        Ok(Self {
            size: meta.len(),
            mtime_ns: mtime_nanos(modified),
        })
    }
}

/// Convert a [`SystemTime`] to integer nanoseconds since the Unix epoch.
///
/// Integer nanoseconds make the cache's exact-equality freshness check a
/// plain compare with no float rounding. Pre-epoch times map to negative
/// values.
#[must_use]
pub fn mtime_nanos(time: SystemTime) -> i64 {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => d.as_nanos() as i64,
        Err(e) => -(e.duration().as_nanos() as i64),
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_file_allow_list() {
        assert!(is_image_file(Path::new("photo.jpg")));
        assert!(is_image_file(Path::new("photo.JPG")));
        assert!(is_image_file(Path::new("photo.JpEg")));
        assert!(is_image_file(Path::new("dir/photo.png")));
        assert!(is_image_file(Path::new("archive.webp")));

        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("photo.svg")));
        assert!(!is_image_file(Path::new("noextension")));
        assert!(!is_image_file(Path::new(".hidden")));
    }

    #[test]
    fn test_mtime_nanos_epoch_is_zero() {
        assert_eq!(mtime_nanos(SystemTime::UNIX_EPOCH), 0);
    }

    #[test]
    fn test_mtime_nanos_is_monotonic_with_time() {
        let earlier = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(100);
        let later = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(200);
        assert!(mtime_nanos(earlier) < mtime_nanos(later));
    }

    #[test]
    fn test_file_meta_of() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file.bin");
        std::fs::write(&path, b"12345").unwrap();

        let meta = FileMeta::of(&path).unwrap();
        assert_eq!(meta.size, 5);
        assert!(meta.mtime_ns > 0);
    }

    #[test]
    fn test_file_meta_of_missing_file() {
        assert!(FileMeta::of(Path::new("/no/such/file.png")).is_err());
    }

    #[test]
    fn test_scan_error_display() {
        let err = ScanError::NotFound(PathBuf::from("/missing"));
        assert_eq!(err.to_string(), "Path not found: /missing");

        let err = ScanError::NotADirectory(PathBuf::from("/file.txt"));
        assert_eq!(err.to_string(), "Not a directory: /file.txt");
    }
}
