use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatchError>;

/// Errors raised while loading features or building the match matrices.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("unknown dataset convention '{0}'")]
    UnknownDataset(String),

    #[error("failed to read feature file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed npy file {path}: {reason}")]
    Npy { path: PathBuf, reason: String },

    /// A feature vector whose length differs from the rest of its set.
    #[error("feature file {path} has dimension {found}, expected {expected}")]
    Dimension {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("probe features have dimension {probe} but gallery features have {gallery}")]
    DimensionMismatch { probe: usize, gallery: usize },

    #[error("no feature files to load")]
    Empty,

    /// `|probe| * |gallery|` is above the configured cell budget.
    #[error("{rows}x{cols} match matrix exceeds the limit of {limit} cells")]
    TooLarge { rows: usize, cols: usize, limit: u64 },

    #[error("feature loader stopped after {received} of {expected} files")]
    WorkerLost { received: usize, expected: usize },
}
