use ndarray::{Array2, ArrayView1};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use threadpool::ThreadPool;

use crate::error::{MatchError, Result};
use crate::identity::Dataset;
use crate::npy;

/// One loaded feature file.
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub path: PathBuf,
    pub feature: Vec<f64>,
    pub subject_id: String,
    pub feature_label: String,
}

impl FeatureRecord {
    pub fn read(path: &Path, dataset: Dataset) -> Result<Self> {
        let feature = npy::read_vector(path)?;
        let identity = dataset.resolve(path);
        Ok(Self {
            path: path.to_path_buf(),
            feature,
            subject_id: identity.subject_id,
            feature_label: identity.feature_label,
        })
    }
}

/// Features of a probe or gallery list, row `i` belonging to file `i`.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    features: Array2<f64>,
    subject_ids: Vec<String>,
    labels: Vec<String>,
}

impl FeatureSet {
    /// Stack records into a dense feature matrix.
    ///
    /// All records must share the dimension of the first one.
    pub fn from_records(records: Vec<FeatureRecord>) -> Result<Self> {
        let first = records.first().ok_or(MatchError::Empty)?;
        let dim = first.feature.len();
        if let Some(bad) = records.iter().find(|r| r.feature.len() != dim) {
            return Err(MatchError::Dimension {
                path: bad.path.clone(),
                expected: dim,
                found: bad.feature.len(),
            });
        }

        let mut features = Array2::zeros((records.len(), dim));
        let mut subject_ids = Vec::with_capacity(records.len());
        let mut labels = Vec::with_capacity(records.len());
        for (mut row, record) in features.rows_mut().into_iter().zip(records) {
            row.assign(&ArrayView1::from(record.feature.as_slice()));
            subject_ids.push(record.subject_id);
            labels.push(record.feature_label);
        }

        Ok(Self {
            features,
            subject_ids,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Feature dimension.
    pub fn dim(&self) -> usize {
        self.features.ncols()
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn subject_ids(&self) -> &[String] {
        &self.subject_ids
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Half the logical cores, at least one.
pub fn default_workers() -> usize {
    (num_cpus::get() / 2).max(1)
}

/// Load `files` on a pool of `workers` threads.
///
/// The returned set keeps the order of `files`. The first unreadable file
/// aborts the load and is reported in the error.
pub fn load<P: AsRef<Path>>(files: &[P], dataset: Dataset, workers: usize) -> Result<FeatureSet> {
    let expected = files.len();
    if expected == 0 {
        return Err(MatchError::Empty);
    }
    let workers = workers.clamp(1, expected);
    log::info!("Loading {} feature files with {} workers", expected, workers);

    let pool = ThreadPool::new(workers);
    let (sender, receiver) = mpsc::channel::<(usize, Result<FeatureRecord>)>();
    let abort = Arc::new(AtomicBool::new(false));

    for (index, file) in files.iter().enumerate() {
        let path = file.as_ref().to_path_buf();
        let sender = sender.clone();
        let abort = Arc::clone(&abort);
        pool.execute(move || {
            if abort.load(Ordering::Relaxed) {
                return;
            }
            let result = FeatureRecord::read(&path, dataset);
            if result.is_err() {
                abort.store(true, Ordering::Relaxed);
            }
            // receiver is gone once another file has failed
            let _ = sender.send((index, result));
        });
    }
    drop(sender);

    let mut slots: Vec<Option<FeatureRecord>> = vec![None; expected];
    let mut received = 0;
    for (index, result) in receiver.iter() {
        match result {
            Ok(record) => {
                log::debug!("Loaded {}", record.path.display());
                slots[index] = Some(record);
            }
            Err(e) => {
                abort.store(true, Ordering::Relaxed);
                return Err(e);
            }
        }
        received += 1;
        if received == expected {
            break;
        }
    }

    let records = slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or(MatchError::WorkerLost { received, expected })?;
    FeatureSet::from_records(records)
}
