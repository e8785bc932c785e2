use ndarray::{Array2, ArrayView2, Axis};

/// Dense probe x gallery score matrix.
pub type ScoreMatrix = Array2<f64>;

/// Copy of `features` with every row scaled to unit L2 norm.
///
/// Zero rows stay zero, so they score 0 against everything.
pub fn l2_normalize(features: ArrayView2<f64>) -> Array2<f64> {
    let mut out = features.to_owned();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row.mapv_inplace(|x| x / norm);
        }
    }
    out
}

/// Cosine similarity between every probe row and every gallery row.
pub fn similarity(probe: ArrayView2<f64>, gallery: ArrayView2<f64>) -> ScoreMatrix {
    let p = l2_normalize(probe);
    let g = l2_normalize(gallery);
    let mut scores = p.dot(&g.t());
    // rounding can push unit vectors just past 1
    scores.mapv_inplace(|s| s.clamp(-1.0, 1.0));
    scores
}
