use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use photofind::config::SearchConfig;
use photofind::hashing::{FingerprintHasher, HashAlgorithm};
use photofind::scanner::list_image_files;
use photofind::search::SimilaritySearch;

// Helper to create a directory tree of small generated images
fn setup_image_tree(dirs: usize, images_per_dir: usize) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for d in 0..dirs {
        let dir = temp_dir.path().join(format!("dir_{d}"));
        std::fs::create_dir_all(&dir).unwrap();
        for i in 0..images_per_dir {
            write_image(&dir.join(format!("img_{i}.png")), (d * 31 + i) as u8);
        }
    }
    temp_dir
}

fn write_image(path: &Path, seed: u8) {
    let img = image::RgbImage::from_fn(32, 32, |x, y| {
        image::Rgb([
            seed.wrapping_add((x * 3) as u8),
            seed.wrapping_mul((y + 1) as u8),
            seed,
        ])
    });
    img.save(path).unwrap();
}

// 1. Directory listing
fn bench_list_image_files(c: &mut Criterion) {
    let tree = setup_image_tree(10, 15); // 150 images

    c.bench_function("list_150_images", |b| {
        b.iter(|| {
            let files = list_image_files(tree.path()).unwrap();
            black_box(files);
        })
    });
}

// 2. Fingerprinting a single image per algorithm
fn bench_fingerprint(c: &mut Criterion) {
    let tree = TempDir::new().unwrap();
    let path = tree.path().join("image.png");
    write_image(&path, 42);

    let mut group = c.benchmark_group("fingerprint");
    for algorithm in [
        HashAlgorithm::Average,
        HashAlgorithm::Perceptual,
        HashAlgorithm::Difference,
    ] {
        let hasher = FingerprintHasher::new(algorithm, 16);
        group.bench_function(algorithm.as_key(), |b| {
            b.iter(|| {
                let fp = hasher.fingerprint(&path, 0, 0).unwrap();
                black_box(fp);
            })
        });
    }
    group.finish();
}

// 3. Full search, cold (no cache) vs warm (cache primed)
fn bench_search(c: &mut Criterion) {
    let tree = setup_image_tree(5, 20); // 100 images
    let reference = tree.path().join("dir_0").join("img_0.png");

    let mut group = c.benchmark_group("search_100_images");
    group.sample_size(10);

    group.bench_function("no_cache", |b| {
        let config = SearchConfig::default()
            .with_algorithm(HashAlgorithm::Average)
            .with_size_tolerance(None)
            .without_cache();
        b.iter(|| {
            let outcome = SimilaritySearch::new(config.clone())
                .run(&reference, tree.path())
                .unwrap();
            black_box(outcome);
        })
    });

    group.bench_function("warm_cache", |b| {
        let state = TempDir::new().unwrap();
        let cache_db: PathBuf = state.path().join("cache.sqlite3");
        let config = SearchConfig::default()
            .with_algorithm(HashAlgorithm::Average)
            .with_size_tolerance(None)
            .with_cache_path(cache_db);
        // Prime the cache once so the measured runs are pure cache hits.
        SimilaritySearch::new(config.clone())
            .run(&reference, tree.path())
            .unwrap();
        b.iter(|| {
            let outcome = SimilaritySearch::new(config.clone())
                .run(&reference, tree.path())
                .unwrap();
            black_box(outcome);
        })
    });

    group.finish();
}

criterion_group!(benches, bench_list_image_files, bench_fingerprint, bench_search);
criterion_main!(benches);
