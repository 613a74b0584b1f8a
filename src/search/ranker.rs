//! Similarity ranking of candidate fingerprints against the reference.

use std::cmp::Ordering;

use crate::hashing::Fingerprint;

use super::MatchResult;

/// Filter candidates by similarity threshold and sort the matches.
///
/// Keeps every candidate whose similarity to `reference` is at least
/// `threshold_pct` (inclusive). Matches are sorted by descending similarity;
/// ties are broken by candidate path so the output order is reproducible
/// across runs with identical inputs.
#[must_use]
pub fn rank(
    reference: &Fingerprint,
    candidates: &[Fingerprint],
    threshold_pct: f64,
) -> Vec<MatchResult> {
    let mut matches: Vec<MatchResult> = candidates
        .iter()
        .filter_map(|candidate| {
            let similarity_pct = reference.similarity_pct(candidate);
            if similarity_pct >= threshold_pct {
                Some(MatchResult {
                    reference: reference.path.clone(),
                    candidate: candidate.path.clone(),
                    distance: reference.distance(candidate),
                    similarity_pct,
                    file_size: candidate.file_size,
                })
            } else {
                None
            }
        })
        .collect();

    matches.sort_by(|a, b| {
        b.similarity_pct
            .partial_cmp(&a.similarity_pct)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.candidate.cmp(&b.candidate))
    });
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::HashAlgorithm;
    use image_hasher::ImageHash;
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn fingerprint(path: &str, bytes: &[u8]) -> Fingerprint {
        Fingerprint {
            path: PathBuf::from(path),
            hash: ImageHash::from_bytes(bytes).unwrap(),
            algorithm: HashAlgorithm::Average,
            file_size: 100,
            mtime_ns: 0,
        }
    }

    #[test]
    fn test_identical_candidate_ranks_first_at_100() {
        let reference = fingerprint("/ref.png", &[0x0F; 8]);
        let same = fingerprint("/same.png", &[0x0F; 8]);
        let far = fingerprint("/far.png", &[0xF0; 8]);

        let matches = rank(&reference, &[far, same], 90.0);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].candidate, PathBuf::from("/same.png"));
        assert_eq!(matches[0].similarity_pct, 100.0);
        assert_eq!(matches[0].distance, 0);
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        // 8 of 64 bits differ: similarity 87.5 exactly.
        let reference = fingerprint("/ref.png", &[0x00; 8]);
        let mut bytes = [0x00u8; 8];
        bytes[0] = 0xFF;
        let candidate = fingerprint("/c.png", &bytes);

        assert_eq!(rank(&reference, std::slice::from_ref(&candidate), 87.5).len(), 1);
        assert!(rank(&reference, std::slice::from_ref(&candidate), 87.6).is_empty());
    }

    #[test]
    fn test_ties_break_by_candidate_path() {
        let reference = fingerprint("/ref.png", &[0x00; 8]);
        let b = fingerprint("/b.png", &[0x00; 8]);
        let a = fingerprint("/a.png", &[0x00; 8]);

        let matches = rank(&reference, &[b, a], 50.0);
        assert_eq!(matches[0].candidate, PathBuf::from("/a.png"));
        assert_eq!(matches[1].candidate, PathBuf::from("/b.png"));
    }

    #[test]
    fn test_sorted_descending_by_similarity() {
        let reference = fingerprint("/ref.png", &[0x00; 8]);
        let close = {
            let mut bytes = [0x00u8; 8];
            bytes[0] = 0x01;
            fingerprint("/close.png", &bytes)
        };
        let exact = fingerprint("/exact.png", &[0x00; 8]);

        let matches = rank(&reference, &[close, exact], 0.0);
        assert_eq!(matches[0].candidate, PathBuf::from("/exact.png"));
        assert_eq!(matches[1].candidate, PathBuf::from("/close.png"));
        assert!(matches[0].similarity_pct > matches[1].similarity_pct);
    }

    proptest! {
        /// Raising the threshold can only shrink (or preserve) the match set,
        /// and every returned match meets the threshold.
        #[test]
        fn prop_threshold_monotonicity(
            hashes in proptest::collection::vec(proptest::array::uniform8(any::<u8>()), 1..20),
            low in 0.0f64..100.0,
            delta in 0.0f64..50.0,
        ) {
            let reference = fingerprint("/ref.png", &[0u8; 8]);
            let candidates: Vec<Fingerprint> = hashes
                .iter()
                .enumerate()
                .map(|(i, bytes)| fingerprint(&format!("/c{i}.png"), bytes))
                .collect();

            let high = (low + delta).min(100.0);
            let loose = rank(&reference, &candidates, low);
            let strict = rank(&reference, &candidates, high);

            prop_assert!(strict.len() <= loose.len());
            for m in &strict {
                prop_assert!(m.similarity_pct >= high);
                prop_assert!(loose.iter().any(|l| l.candidate == m.candidate));
            }
            for m in &loose {
                prop_assert!(m.similarity_pct >= low);
            }
        }
    }
}
