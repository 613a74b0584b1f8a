use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use photofind::config::SearchConfig;
use photofind::error::SearchError;
use photofind::hashing::HashAlgorithm;
use photofind::search::SimilaritySearch;
use tempfile::tempdir;

/// Write a horizontal gradient image; `invert` flips its direction so the
/// two variants produce clearly different fingerprints.
fn write_gradient(path: &Path, invert: bool) {
    let img = image::RgbImage::from_fn(64, 64, |x, _y| {
        let v = (x * 4).min(252) as u8;
        let v = if invert { 255 - v } else { v };
        image::Rgb([v, v, v])
    });
    img.save(path).unwrap();
}

fn base_config() -> SearchConfig {
    SearchConfig::default()
        .with_algorithm(HashAlgorithm::Average)
        .with_threshold(90.0)
        .with_size_tolerance(None)
        .without_cache()
}

#[test]
fn test_search_finds_identical_image() {
    let dir = tempdir().unwrap();
    let reference = dir.path().join("ref.png");
    write_gradient(&reference, false);

    // A is byte-for-byte identical to the reference; B differs entirely.
    let a = dir.path().join("a.png");
    std::fs::copy(&reference, &a).unwrap();
    let b = dir.path().join("b.png");
    write_gradient(&b, true);

    let search = SimilaritySearch::new(base_config());
    let outcome = search.run(&reference, dir.path()).unwrap();

    assert_eq!(outcome.stats.total_files, 2);
    assert_eq!(outcome.stats.matches_found, 1);
    assert_eq!(outcome.matches.len(), 1);

    let m = &outcome.matches[0];
    assert_eq!(m.candidate, a.canonicalize().unwrap());
    assert_eq!(m.similarity_pct, 100.0);
    assert_eq!(m.distance, 0);
}

#[test]
fn test_reference_is_excluded_from_candidates() {
    let dir = tempdir().unwrap();
    let reference = dir.path().join("ref.png");
    write_gradient(&reference, false);

    let search = SimilaritySearch::new(base_config());
    let outcome = search.run(&reference, dir.path()).unwrap();

    // The reference itself is the only image in the tree.
    assert_eq!(outcome.stats.total_files, 0);
    assert!(outcome.matches.is_empty());
}

#[test]
fn test_empty_directory() {
    let dir = tempdir().unwrap();
    let outside = tempdir().unwrap();
    let reference = outside.path().join("ref.png");
    write_gradient(&reference, false);

    let search = SimilaritySearch::new(base_config());
    let outcome = search.run(&reference, dir.path()).unwrap();

    assert!(outcome.matches.is_empty());
    assert_eq!(outcome.stats.total_files, 0);
    assert_eq!(outcome.stats.images_hashed, 0);
    assert!(!outcome.stats.interrupted);
}

#[test]
fn test_nested_candidates_are_found() {
    let dir = tempdir().unwrap();
    let outside = tempdir().unwrap();
    let reference = outside.path().join("ref.png");
    write_gradient(&reference, false);

    let nested = dir.path().join("deep").join("deeper");
    std::fs::create_dir_all(&nested).unwrap();
    let dup = nested.join("dup.png");
    std::fs::copy(&reference, &dup).unwrap();

    let search = SimilaritySearch::new(base_config());
    let outcome = search.run(&reference, dir.path()).unwrap();

    assert_eq!(outcome.stats.total_files, 1);
    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].candidate, dup.canonicalize().unwrap());
}

#[test]
fn test_raising_threshold_shrinks_matches() {
    let dir = tempdir().unwrap();
    let outside = tempdir().unwrap();
    let reference = outside.path().join("ref.png");
    write_gradient(&reference, false);

    let same = dir.path().join("same.png");
    std::fs::copy(&reference, &same).unwrap();
    let different = dir.path().join("different.png");
    write_gradient(&different, true);

    let loose = SimilaritySearch::new(base_config().with_threshold(0.0))
        .run(&reference, dir.path())
        .unwrap();
    let strict = SimilaritySearch::new(base_config().with_threshold(100.0))
        .run(&reference, dir.path())
        .unwrap();

    assert_eq!(loose.matches.len(), 2);
    assert_eq!(strict.matches.len(), 1);
    assert_eq!(
        strict.matches[0].candidate,
        same.canonicalize().unwrap()
    );
}

#[test]
fn test_unreadable_candidate_is_counted_not_fatal() {
    let dir = tempdir().unwrap();
    let outside = tempdir().unwrap();
    let reference = outside.path().join("ref.png");
    write_gradient(&reference, false);

    let good = dir.path().join("good.png");
    std::fs::copy(&reference, &good).unwrap();
    let corrupt = dir.path().join("corrupt.png");
    std::fs::write(&corrupt, b"not an image at all").unwrap();

    let search = SimilaritySearch::new(base_config());
    let outcome = search.run(&reference, dir.path()).unwrap();

    assert_eq!(outcome.stats.total_files, 2);
    assert_eq!(outcome.stats.images_hashed, 1);
    assert_eq!(outcome.stats.images_failed, 1);
    assert_eq!(outcome.matches.len(), 1);
}

#[test]
fn test_missing_reference_is_fatal() {
    let dir = tempdir().unwrap();
    let search = SimilaritySearch::new(base_config());
    let result = search.run(Path::new("/no/such/ref.png"), dir.path());
    assert!(matches!(result, Err(SearchError::ReferenceNotFound(_))));
}

#[test]
fn test_missing_directory_is_fatal() {
    let outside = tempdir().unwrap();
    let reference = outside.path().join("ref.png");
    write_gradient(&reference, false);

    let search = SimilaritySearch::new(base_config());
    let result = search.run(&reference, Path::new("/no/such/directory"));
    assert!(matches!(result, Err(SearchError::DirectoryNotFound(_))));
}

#[test]
fn test_undecodable_reference_is_fatal() {
    let dir = tempdir().unwrap();
    let reference = dir.path().join("ref.png");
    std::fs::write(&reference, b"still not an image").unwrap();

    let search = SimilaritySearch::new(base_config());
    let result = search.run(&reference, dir.path());
    assert!(matches!(
        result,
        Err(SearchError::ReferenceUnhashable { .. })
    ));
}

#[test]
fn test_preset_shutdown_returns_partial_results() {
    let dir = tempdir().unwrap();
    let outside = tempdir().unwrap();
    let reference = outside.path().join("ref.png");
    write_gradient(&reference, false);

    let dup = dir.path().join("dup.png");
    std::fs::copy(&reference, &dup).unwrap();

    let flag = Arc::new(AtomicBool::new(true));
    let search = SimilaritySearch::new(base_config()).with_shutdown_flag(flag);
    let outcome = search.run(&reference, dir.path()).unwrap();

    // Interruption is not an error: the run returns with partial (here:
    // empty) results and honest statistics.
    assert!(outcome.stats.interrupted);
    assert_eq!(outcome.stats.images_hashed, 0);
    assert!(outcome.matches.is_empty());
}

#[test]
fn test_size_prefilter_drops_out_of_range_candidates() {
    let dir = tempdir().unwrap();
    let outside = tempdir().unwrap();
    let reference = outside.path().join("ref.png");
    write_gradient(&reference, false);

    let dup = dir.path().join("dup.png");
    std::fs::copy(&reference, &dup).unwrap();

    // A much larger file: random-ish noise compresses poorly.
    let big = dir.path().join("big.png");
    let noisy = image::RgbImage::from_fn(512, 512, |x, y| {
        image::Rgb([
            (x * 31 % 251) as u8,
            (y * 17 % 239) as u8,
            ((x + y) * 13 % 233) as u8,
        ])
    });
    noisy.save(&big).unwrap();

    let config = base_config().with_size_tolerance(Some(10.0));
    let outcome = SimilaritySearch::new(config)
        .run(&reference, dir.path())
        .unwrap();

    // Only the identical copy survives the prefilter.
    assert_eq!(outcome.stats.total_files, 1);
    assert_eq!(outcome.matches.len(), 1);
}
