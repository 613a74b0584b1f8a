//! Error taxonomy and exit codes.
//!
//! Only two kinds of failure abort a search: validation failures (missing
//! reference image or search directory) and an unhashable reference image.
//! Everything else — unreadable candidates, a cache that will not open,
//! cancellation — degrades into statistics or a fallback path inside the
//! search itself.

use std::path::PathBuf;

use serde::Serialize;

use crate::hashing::HashError;

/// Fatal errors from a similarity search.
///
/// Each of these aborts before any parallel work has started.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The reference image does not exist or cannot be read.
    #[error("Reference image not found: {0}")]
    ReferenceNotFound(PathBuf),

    /// The search directory does not exist or is not a directory.
    #[error("Search directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// The reference image exists but no fingerprint could be computed
    /// from it.
    #[error("Could not process reference image {path}: {source}")]
    ReferenceUnhashable {
        /// The reference path that failed to decode.
        path: PathBuf,
        /// The underlying decode failure.
        #[source]
        source: HashError,
    },
}

/// Exit codes for the photofind CLI.
///
/// - 0: Success (completed normally, matches found)
/// - 1: General error (unexpected failure)
/// - 2: No matches found (completed normally)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Search completed and at least one match was found.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// Search completed but nothing met the threshold.
    NoMatches = 2,
    /// Search was interrupted by the user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "PF000",
            Self::GeneralError => "PF001",
            Self::NoMatches => "PF002",
            Self::Interrupted => "PF130",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "PF001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::GeneralError.as_i32(), 1);
        assert_eq!(ExitCode::NoMatches.as_i32(), 2);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
    }

    #[test]
    fn test_code_prefixes() {
        assert_eq!(ExitCode::Success.code_prefix(), "PF000");
        assert_eq!(ExitCode::Interrupted.code_prefix(), "PF130");
    }

    #[test]
    fn test_search_error_display() {
        let err = SearchError::ReferenceNotFound(PathBuf::from("/missing.png"));
        assert_eq!(err.to_string(), "Reference image not found: /missing.png");

        let err = SearchError::DirectoryNotFound(PathBuf::from("/nowhere"));
        assert_eq!(err.to_string(), "Search directory not found: /nowhere");
    }
}
