use ndarray::{s, Array1, Array2, Zip};
use std::collections::HashMap;

/// Class of one (probe, gallery) cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum PairClass {
    Genuine = 1,
    Impostor = 0,
    /// Same sample, self match, or mirrored half of a symmetric match.
    Excluded = -1,
}

impl PairClass {
    pub fn code(self) -> i8 {
        self as i8
    }

    pub fn from_code(code: i8) -> Self {
        match code {
            1 => PairClass::Genuine,
            0 => PairClass::Impostor,
            _ => PairClass::Excluded,
        }
    }
}

/// Dense `|probe| x |gallery|` matrix of [`PairClass`] codes.
#[derive(Debug, Clone)]
pub struct ClassificationMatrix {
    cells: Array2<i8>,
}

impl ClassificationMatrix {
    pub fn get(&self, row: usize, col: usize) -> PairClass {
        PairClass::from_code(self.cells[[row, col]])
    }

    pub fn shape(&self) -> (usize, usize) {
        self.cells.dim()
    }

    pub fn codes(&self) -> &Array2<i8> {
        &self.cells
    }

    pub fn count(&self, class: PairClass) -> usize {
        let code = class.code();
        self.cells.iter().filter(|&&c| c == code).count()
    }
}

/// Maps strings shared by probe and gallery to dense integer codes so rows
/// compare as integers.
#[derive(Default)]
struct Interner<'a> {
    codes: HashMap<&'a str, u32>,
}

impl<'a> Interner<'a> {
    fn encode(&mut self, values: &'a [String]) -> Array1<u32> {
        values
            .iter()
            .map(|v| {
                let next = self.codes.len() as u32;
                *self.codes.entry(v.as_str()).or_insert(next)
            })
            .collect()
    }
}

/// Build the classification matrix.
///
/// A cell is excluded when both sides carry the same feature label, or when
/// `probe_equals_gallery` and the cell lies on or below the diagonal.
/// Otherwise it is genuine when the subject ids match and impostor when they
/// differ.
pub fn classify(
    probe_labels: &[String],
    probe_ids: &[String],
    gallery_labels: &[String],
    gallery_ids: &[String],
    probe_equals_gallery: bool,
) -> ClassificationMatrix {
    let mut ids = Interner::default();
    let p_ids = ids.encode(probe_ids);
    let g_ids = ids.encode(gallery_ids);
    let mut labels = Interner::default();
    let p_labels = labels.encode(probe_labels);
    let g_labels = labels.encode(gallery_labels);

    let cols = g_ids.len();
    let mut cells = Array2::<i8>::zeros((p_ids.len(), cols));
    for (i, mut row) in cells.rows_mut().into_iter().enumerate() {
        let (pid, plabel) = (p_ids[i], p_labels[i]);
        Zip::from(&mut row)
            .and(&g_ids)
            .and(&g_labels)
            .for_each(|cell, &gid, &glabel| {
                *cell = if glabel == plabel {
                    PairClass::Excluded.code()
                } else if gid == pid {
                    PairClass::Genuine.code()
                } else {
                    PairClass::Impostor.code()
                };
            });
        if probe_equals_gallery {
            let end = (i + 1).min(cols);
            row.slice_mut(s![..end]).fill(PairClass::Excluded.code());
        }
    }

    ClassificationMatrix { cells }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_symmetric_upper_triangle() {
        let labels = strings(&["f/A_1", "f/A_2", "f/B_1", "f/B_2"]);
        let ids = strings(&["A", "A", "B", "B"]);
        let m = classify(&labels, &ids, &labels, &ids, true);

        use PairClass::*;
        let expected = [
            [Excluded, Genuine, Impostor, Impostor],
            [Excluded, Excluded, Impostor, Impostor],
            [Excluded, Excluded, Excluded, Genuine],
            [Excluded, Excluded, Excluded, Excluded],
        ];
        for (i, row) in expected.iter().enumerate() {
            for (j, class) in row.iter().enumerate() {
                assert_eq!(m.get(i, j), *class, "cell ({i}, {j})");
            }
        }
        assert_eq!(m.count(Genuine), 2);
        assert_eq!(m.count(Impostor), 4);
    }

    #[test]
    fn test_asymmetric_keeps_lower_triangle() {
        let p_labels = strings(&["p/A_1", "p/B_1"]);
        let p_ids = strings(&["A", "B"]);
        let g_labels = strings(&["g/A_2", "g/B_2", "g/C_1"]);
        let g_ids = strings(&["A", "B", "C"]);
        let m = classify(&p_labels, &p_ids, &g_labels, &g_ids, false);

        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.get(0, 0), PairClass::Genuine);
        assert_eq!(m.get(1, 0), PairClass::Impostor);
        assert_eq!(m.get(1, 1), PairClass::Genuine);
        assert_eq!(m.count(PairClass::Excluded), 0);
    }

    #[test]
    fn test_shared_label_is_excluded() {
        // same sample listed in both sets, and a duplicate under a new subject
        let p_labels = strings(&["s/A_1", "s/B_1"]);
        let p_ids = strings(&["A", "B"]);
        let g_labels = strings(&["s/A_1", "s/B_1"]);
        let g_ids = strings(&["A", "X"]);
        let m = classify(&p_labels, &p_ids, &g_labels, &g_ids, false);

        assert_eq!(m.get(0, 0), PairClass::Excluded);
        assert_eq!(m.get(1, 1), PairClass::Excluded);
        assert_eq!(m.get(0, 1), PairClass::Impostor);
        assert_eq!(m.get(1, 0), PairClass::Impostor);
    }

    #[test]
    fn test_ids_and_labels_do_not_collide() {
        // a subject id equal to some other sample's label must not exclude
        let labels = strings(&["A", "x/A_2"]);
        let ids = strings(&["x/A_2", "A"]);
        let m = classify(&labels, &ids, &labels, &ids, true);
        assert_eq!(m.get(0, 1), PairClass::Impostor);
    }

    #[test]
    fn test_code_round_trip() {
        for class in [PairClass::Genuine, PairClass::Impostor, PairClass::Excluded] {
            assert_eq!(PairClass::from_code(class.code()), class);
        }
    }
}
