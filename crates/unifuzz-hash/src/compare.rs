//! Similarity between two fingerprints
//!
//! `compare(a, b)` is the share of `a`'s bytes whose blocks also occur in
//! `b`. A block occurs in `b` when its encoded `hash/size` text is a
//! substring of `b`'s canonical string. Order is ignored, and a match may
//! straddle a block separator in `b`; scores stay compatible with
//! previously published values because of this.

use rayon::prelude::*;
use std::fmt;
use std::str::FromStr;

use unifuzz_core::{UfhError, UfhResult};

use crate::codec;
use crate::fuzzy::UniformFuzzyHash;

/// How the two directions of a comparison are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimilarityType {
    /// compare(a, b)
    #[default]
    Similarity = 1,
    /// compare(b, a)
    ReverseSimilarity = 2,
    Maximum = 3,
    Minimum = 4,
    ArithmeticMean = 5,
    GeometricMean = 6,
}

impl SimilarityType {
    pub const ALL: [SimilarityType; 6] = [
        SimilarityType::Similarity,
        SimilarityType::ReverseSimilarity,
        SimilarityType::Maximum,
        SimilarityType::Minimum,
        SimilarityType::ArithmeticMean,
        SimilarityType::GeometricMean,
    ];

    /// Map a numeric mode code. Unknown codes fall back to `Similarity`.
    pub fn from_code(code: i64) -> Self {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .unwrap_or(SimilarityType::Similarity)
    }

    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn name(self) -> &'static str {
        match self {
            SimilarityType::Similarity => "similarity",
            SimilarityType::ReverseSimilarity => "reverse",
            SimilarityType::Maximum => "maximum",
            SimilarityType::Minimum => "minimum",
            SimilarityType::ArithmeticMean => "arithmetic-mean",
            SimilarityType::GeometricMean => "geometric-mean",
        }
    }
}

impl fmt::Display for SimilarityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SimilarityType {
    type Err = UfhError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "similarity" => Ok(SimilarityType::Similarity),
            "reverse" | "reverse-similarity" => Ok(SimilarityType::ReverseSimilarity),
            "maximum" | "max" => Ok(SimilarityType::Maximum),
            "minimum" | "min" => Ok(SimilarityType::Minimum),
            "arithmetic-mean" | "mean" => Ok(SimilarityType::ArithmeticMean),
            "geometric-mean" => Ok(SimilarityType::GeometricMean),
            other => Err(UfhError::Config(format!("unknown similarity mode {other:?}"))),
        }
    }
}

/// Share of `a`'s bytes, in `[0, 1]`, whose blocks occur in `b`.
///
/// Both fingerprints must use the same factor. The same object compared
/// with itself scores 1; a fingerprint without blocks on either side
/// scores 0.
pub fn compare(a: &UniformFuzzyHash, b: &UniformFuzzyHash) -> UfhResult<f64> {
    if std::ptr::eq(a, b) {
        return Ok(1.0);
    }

    if a.factor() != b.factor() {
        return Err(UfhError::FactorMismatch {
            left: a.factor(),
            right: b.factor(),
        });
    }

    if a.blocks().is_empty() || b.blocks().is_empty() {
        return Ok(0.0);
    }

    let haystack = codec::encode_hash(b);
    let mut needle = String::with_capacity(codec::BLOCK_MAX_CHARS);
    let mut matched = 0u64;
    for block in a.blocks() {
        needle.clear();
        codec::write_block(&mut needle, block);
        if haystack.contains(needle.as_str()) {
            matched += block.size();
        }
    }

    Ok(matched as f64 / a.data_size() as f64)
}

/// Combine `compare(a, b)` and `compare(b, a)` according to `mode`.
pub fn compare_similarity(
    a: &UniformFuzzyHash,
    b: &UniformFuzzyHash,
    mode: SimilarityType,
) -> UfhResult<f64> {
    match mode {
        SimilarityType::Similarity => compare(a, b),
        SimilarityType::ReverseSimilarity => compare(b, a),
        _ => {
            let similarity = compare(a, b)?;
            let reverse = compare(b, a)?;
            Ok(match mode {
                SimilarityType::Maximum => similarity.max(reverse),
                SimilarityType::Minimum => similarity.min(reverse),
                SimilarityType::ArithmeticMean => (similarity + reverse) / 2.0,
                SimilarityType::GeometricMean => (similarity * reverse).sqrt(),
                SimilarityType::Similarity | SimilarityType::ReverseSimilarity => similarity,
            })
        }
    }
}

/// Score `needle` against every candidate in parallel.
///
/// Results are in candidate order; a failure for one candidate does not
/// affect the others.
pub fn compare_many(
    needle: &UniformFuzzyHash,
    candidates: &[UniformFuzzyHash],
    mode: SimilarityType,
) -> Vec<UfhResult<f64>> {
    let scores: Vec<UfhResult<f64>> = candidates
        .par_iter()
        .map(|candidate| compare_similarity(needle, candidate, mode))
        .collect();

    tracing::debug!(
        candidates = candidates.len(),
        failed = scores.iter().filter(|s| s.is_err()).count(),
        %mode,
        "batch comparison done"
    );
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::compute;
    use proptest::prelude::*;

    fn parse(s: &str) -> UniformFuzzyHash {
        crate::parse_hash(s).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn identity_is_one_in_every_mode() {
        let h = compute(b"identity comparison takes the fast path", 5).unwrap();
        for mode in SimilarityType::ALL {
            assert_eq!(compare_similarity(&h, &h, mode).unwrap(), 1.0, "{mode}");
        }

        // Even without blocks
        let empty = compute(&[], 5).unwrap();
        assert_eq!(compare(&empty, &empty).unwrap(), 1.0);
    }

    #[test]
    fn equal_copy_is_one() {
        let h = compute(b"a copy is not the same object but has the same blocks", 7).unwrap();
        let copy = h.clone();
        assert_eq!(compare(&h, &copy).unwrap(), 1.0);
    }

    #[test]
    fn factor_mismatch_is_an_error() {
        let a = compute(b"same data", 3).unwrap();
        let b = compute(b"same data", 5).unwrap();
        assert!(matches!(
            compare(&a, &b),
            Err(UfhError::FactorMismatch { left: 3, right: 5 })
        ));
        for mode in SimilarityType::ALL {
            assert!(compare_similarity(&a, &b, mode).is_err());
        }
    }

    #[test]
    fn empty_fingerprint_scores_zero() {
        let empty = compute(&[], 5).unwrap();
        let full = compute(b"not empty", 5).unwrap();
        assert_eq!(compare(&empty, &full).unwrap(), 0.0);
        assert_eq!(compare(&full, &empty).unwrap(), 0.0);
    }

    #[test]
    fn modes_combine_both_directions() {
        let a = parse("3:a/2-b/2");
        let b = parse("3:a/2-c/4");

        // a: 2 of 4 bytes found, b: 2 of 6 bytes found
        let forward = 0.5;
        let reverse = 2.0 / 6.0;

        let score = |mode| compare_similarity(&a, &b, mode).unwrap();
        assert!(close(score(SimilarityType::Similarity), forward));
        assert!(close(score(SimilarityType::ReverseSimilarity), reverse));
        assert!(close(score(SimilarityType::Maximum), forward));
        assert!(close(score(SimilarityType::Minimum), reverse));
        assert!(close(score(SimilarityType::ArithmeticMean), (forward + reverse) / 2.0));
        assert!(close(score(SimilarityType::GeometricMean), (forward * reverse).sqrt()));
    }

    #[test]
    fn order_of_blocks_is_ignored() {
        let a = parse("3:a/2-b/3");
        let b = parse("3:b/3-a/2");
        assert_eq!(compare(&a, &b).unwrap(), 1.0);
    }

    #[test]
    fn match_is_textual_containment() {
        // "1/1" occurs inside "11/1" although no block of b has hash 1
        let a = parse("3:1/1");
        let b = parse("3:11/1");
        assert_eq!(compare(&a, &b).unwrap(), 1.0);
        assert_eq!(compare(&b, &a).unwrap(), 0.0);
    }

    #[test]
    fn mode_codes() {
        assert_eq!(SimilarityType::from_code(1), SimilarityType::Similarity);
        assert_eq!(SimilarityType::from_code(3), SimilarityType::Maximum);
        assert_eq!(SimilarityType::from_code(6), SimilarityType::GeometricMean);
        assert_eq!(SimilarityType::from_code(0), SimilarityType::Similarity);
        assert_eq!(SimilarityType::from_code(42), SimilarityType::Similarity);
        for mode in SimilarityType::ALL {
            assert_eq!(SimilarityType::from_code(mode.code()), mode);
            assert_eq!(mode.name().parse::<SimilarityType>().unwrap(), mode);
        }
        assert!("median".parse::<SimilarityType>().is_err());
    }

    #[test]
    fn compare_many_keeps_order_and_isolates_errors() {
        let needle = compute(b"the quick brown fox jumps over the lazy dog", 3).unwrap();
        let candidates = vec![
            needle.clone(),
            compute(b"the quick brown fox", 5).unwrap(),
            compute(&[], 3).unwrap(),
        ];

        let scores = compare_many(&needle, &candidates, SimilarityType::Maximum);
        assert_eq!(scores.len(), 3);
        assert_eq!(*scores[0].as_ref().unwrap(), 1.0);
        assert!(matches!(scores[1], Err(UfhError::FactorMismatch { .. })));
        assert_eq!(*scores[2].as_ref().unwrap(), 0.0);
    }

    proptest! {
        #[test]
        fn scores_are_bounded(
            a in proptest::collection::vec(any::<u8>(), 0..=2048),
            b in proptest::collection::vec(any::<u8>(), 0..=2048),
        ) {
            let ha = compute(&a, 5).unwrap();
            let hb = compute(&b, 5).unwrap();
            for mode in SimilarityType::ALL {
                let s = compare_similarity(&ha, &hb, mode).unwrap();
                prop_assert!((0.0..=1.0).contains(&s), "{} out of bounds for {}", s, mode);
            }
        }

        #[test]
        fn self_similarity(data in proptest::collection::vec(any::<u8>(), 1..=2048)) {
            let h = compute(&data, 7).unwrap();
            let copy = h.clone();
            prop_assert_eq!(compare(&h, &copy).unwrap(), 1.0);
        }
    }
}
