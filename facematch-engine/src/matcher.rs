use crate::classify::{classify, ClassificationMatrix, PairClass};
use crate::error::{MatchError, Result};
use crate::extract::{pairs, ScoreRecord};
use crate::loader::FeatureSet;
use crate::similarity::{similarity, ScoreMatrix};

/// Largest `|probe| * |gallery|` accepted by default.
///
/// Each cell costs 9 bytes (an f64 score and an i8 class), so the default
/// peaks around 4.5 GB. Score records are streamed out one class at a time
/// and never buffered.
pub const DEFAULT_MAX_CELLS: u64 = 500_000_000;

/// Probe set matched against a gallery set, or against itself when no
/// gallery is given.
pub struct Matcher {
    probe: FeatureSet,
    gallery: Option<FeatureSet>,
    classes: ClassificationMatrix,
}

impl Matcher {
    /// Validate the pairing and classify every cell.
    ///
    /// Fails before allocating anything quadratic when the matrix would
    /// exceed `max_cells`.
    pub fn new(probe: FeatureSet, gallery: Option<FeatureSet>, max_cells: u64) -> Result<Self> {
        let g = gallery.as_ref().unwrap_or(&probe);
        if g.dim() != probe.dim() {
            return Err(MatchError::DimensionMismatch {
                probe: probe.dim(),
                gallery: g.dim(),
            });
        }
        let cells = probe.len() as u64 * g.len() as u64;
        if cells > max_cells {
            return Err(MatchError::TooLarge {
                rows: probe.len(),
                cols: g.len(),
                limit: max_cells,
            });
        }

        let classes = classify(
            probe.labels(),
            probe.subject_ids(),
            g.labels(),
            g.subject_ids(),
            gallery.is_none(),
        );
        let (rows, cols) = classes.shape();
        log::info!("{}x{} match matrix classified", rows, cols);

        Ok(Self {
            probe,
            gallery,
            classes,
        })
    }

    pub fn probe_equals_gallery(&self) -> bool {
        self.gallery.is_none()
    }

    pub fn probe(&self) -> &FeatureSet {
        &self.probe
    }

    /// The gallery, which is the probe set itself in a symmetric match.
    pub fn gallery(&self) -> &FeatureSet {
        self.gallery.as_ref().unwrap_or(&self.probe)
    }

    pub fn classes(&self) -> &ClassificationMatrix {
        &self.classes
    }

    pub fn score(&self) -> ScoreMatrix {
        similarity(self.probe.features().view(), self.gallery().features().view())
    }

    /// Number of cells of `class`.
    pub fn count(&self, class: PairClass) -> usize {
        self.classes.count(class)
    }

    /// Stream the scored cells of `class` in row-major order.
    pub fn pairs<'a>(
        &'a self,
        scores: &'a ScoreMatrix,
        class: PairClass,
        precision: u32,
    ) -> impl Iterator<Item = ScoreRecord> + 'a {
        pairs(&self.classes, scores, class, precision)
    }
}
