//! Directory walker for image discovery using jwalk.
//!
//! Recursively traverses a directory tree and collects every file whose
//! extension is on the [`IMAGE_EXTENSIONS`](super::IMAGE_EXTENSIONS)
//! allow-list. Uses [`jwalk`] for parallel directory reading, which is
//! substantially faster than a single-threaded walk on large trees.

use std::path::{Path, PathBuf};

use jwalk::WalkDir;

use super::{is_image_file, ScanError};

/// Directory walker for recursive image file discovery.
///
/// # Example
///
/// ```no_run
/// use photofind::scanner::Walker;
/// use std::path::Path;
///
/// let walker = Walker::new(Path::new("/home/user/Pictures"));
/// let images = walker.collect_images().unwrap();
/// println!("Found {} images", images.len());
/// ```
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
}

impl Walker {
    /// Create a new walker for the given root directory.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Walk the tree and collect all image file paths.
    ///
    /// Unreadable subdirectories are logged and skipped rather than failing
    /// the whole walk; only a root that cannot be walked at all is an error.
    /// Children are sorted during traversal so the returned list is
    /// deterministic for an unchanged tree.
    pub fn collect_images(&self) -> Result<Vec<PathBuf>, ScanError> {
        if !self.root.exists() {
            return Err(ScanError::NotFound(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }

        let walk_dir = WalkDir::new(&self.root).follow_links(false).process_read_dir(
            |_depth, _path, _read_dir_state, children| {
                // Sort children for deterministic output
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
            },
        );

        let mut images = Vec::new();
        for entry_result in walk_dir {
            match entry_result {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let path = entry.path();
                    if is_image_file(&path) {
                        images.push(path);
                    }
                }
                Err(e) => {
                    log::warn!("Skipping unreadable entry during walk: {}", e);
                }
            }
        }

        log::debug!(
            "Walker: found {} image files under {}",
            images.len(),
            self.root.display()
        );
        Ok(images)
    }
}

/// Recursively collect all image paths in a directory.
///
/// Convenience wrapper over [`Walker`]; this is the directory scan
/// collaborator the search orchestrator uses when the directory index
/// cache misses.
pub fn list_image_files(root: &Path) -> Result<Vec<PathBuf>, ScanError> {
    Walker::new(root).collect_images()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_collect_images_recursive_and_filtered() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"x").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"x").unwrap();

        let sub = dir.path().join("nested");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("c.JPG"), b"x").unwrap();
        std::fs::write(sub.join("d.webp"), b"x").unwrap();
        std::fs::write(sub.join("e.pdf"), b"x").unwrap();

        let images = list_image_files(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(images.len(), 3);
        assert!(names.contains(&"a.png".to_string()));
        assert!(names.contains(&"c.JPG".to_string()));
        assert!(names.contains(&"d.webp".to_string()));
    }

    #[test]
    fn test_collect_images_empty_directory() {
        let dir = tempdir().unwrap();
        let images = list_image_files(dir.path()).unwrap();
        assert!(images.is_empty());
    }

    #[test]
    fn test_collect_images_deterministic_order() {
        let dir = tempdir().unwrap();
        for name in ["z.png", "a.png", "m.png"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let first = list_image_files(dir.path()).unwrap();
        let second = list_image_files(dir.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let result = list_image_files(Path::new("/no/such/directory"));
        assert!(matches!(result, Err(ScanError::NotFound(_))));
    }

    #[test]
    fn test_file_root_is_an_error() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file.png");
        std::fs::write(&file, b"x").unwrap();

        let result = list_image_files(&file);
        assert!(matches!(result, Err(ScanError::NotADirectory(_))));
    }
}
