use serde::{Deserialize, Serialize};

use crate::classify::{ClassificationMatrix, PairClass};
use crate::similarity::ScoreMatrix;

/// Digits kept in persisted scores.
pub const DEFAULT_PRECISION: u32 = 6;

/// Most digits an f64 score can carry through rounding.
pub const MAX_PRECISION: u32 = 15;

/// One scored pair, indices into the probe and gallery sets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub probe_index: u32,
    pub gallery_index: u32,
    pub score: f64,
}

impl ScoreRecord {
    /// `[probe_index, gallery_index, score]`, one row of a score table.
    pub fn to_row(&self) -> [f64; 3] {
        [self.probe_index as f64, self.gallery_index as f64, self.score]
    }
}

/// Round half to even at `precision` decimal digits, as numpy does.
///
/// `precision` is capped at [`MAX_PRECISION`]; beyond it the scale factor
/// stops being exact and large values overflow to infinity.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision.min(MAX_PRECISION) as i32);
    (value * scale).round_ties_even() / scale
}

/// Lazily yield the cells of class `class`, in row-major order.
///
/// Nothing is buffered, so callers can stream records straight to disk.
/// Excluded cells are never yielded, whatever `class` is.
pub fn pairs<'a>(
    classes: &'a ClassificationMatrix,
    scores: &'a ScoreMatrix,
    class: PairClass,
    precision: u32,
) -> impl Iterator<Item = ScoreRecord> + 'a {
    debug_assert_eq!(classes.shape(), scores.dim());
    let code = class.code();
    let wanted = class != PairClass::Excluded;

    classes
        .codes()
        .outer_iter()
        .zip(scores.outer_iter())
        .enumerate()
        .filter(move |_| wanted)
        .flat_map(move |(i, (crow, srow))| {
            crow.into_iter()
                .zip(srow)
                .enumerate()
                .filter(move |&(_, (&c, _))| c == code)
                .map(move |(j, (_, &s))| ScoreRecord {
                    probe_index: i as u32,
                    gallery_index: j as u32,
                    score: round_to(s, precision),
                })
        })
}

/// Collect the cells of class `class`, in row-major order.
pub fn extract(
    classes: &ClassificationMatrix,
    scores: &ScoreMatrix,
    class: PairClass,
    precision: u32,
) -> Vec<ScoreRecord> {
    pairs(classes, scores, class, precision).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use ndarray::array;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.123_456_78, 6), 0.123_457);
        assert_eq!(round_to(-1.5, 0), -2.0);
        assert_eq!(round_to(0.25, 1), 0.2);
    }

    #[test]
    fn test_extract_by_class() {
        let labels = strings(&["d/A_1", "d/A_2", "d/B_1"]);
        let ids = strings(&["A", "A", "B"]);
        let classes = classify(&labels, &ids, &labels, &ids, true);
        let scores = array![
            [1.0, 0.912_345_67, 0.1],
            [0.912_345_67, 1.0, -0.2],
            [0.1, -0.2, 1.0]
        ];

        let genuine = extract(&classes, &scores, PairClass::Genuine, 6);
        assert_eq!(genuine.len(), 1);
        assert_eq!((genuine[0].probe_index, genuine[0].gallery_index), (0, 1));
        assert!((genuine[0].score - 0.912_346).abs() < 1e-9);

        let impostor = extract(&classes, &scores, PairClass::Impostor, 6);
        let pairs: Vec<_> = impostor
            .iter()
            .map(|r| (r.probe_index, r.gallery_index))
            .collect();
        assert_eq!(pairs, vec![(0, 2), (1, 2)]);

        assert!(extract(&classes, &scores, PairClass::Excluded, 6).is_empty());
    }

    #[test]
    fn test_to_row() {
        let record = ScoreRecord {
            probe_index: 3,
            gallery_index: 7,
            score: 0.5,
        };
        assert_eq!(record.to_row(), [3.0, 7.0, 0.5]);
    }

    #[test]
    fn test_precision_is_capped() {
        assert!(round_to(0.5, 400).is_finite());
        assert_eq!(round_to(0.5, 400), 0.5);
        assert_eq!(round_to(0.1, MAX_PRECISION), 0.1);
    }
}
