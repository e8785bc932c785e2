pub mod classify;
pub mod error;
pub mod extract;
pub mod identity;
pub mod loader;
pub mod matcher;
pub mod npy;
pub mod similarity;

// Re-export commonly used types
pub use classify::{classify, ClassificationMatrix, PairClass};
pub use error::MatchError;
pub use extract::{extract, pairs, ScoreRecord};
pub use identity::{Dataset, Identity};
pub use loader::{FeatureRecord, FeatureSet};
pub use matcher::Matcher;
pub use similarity::{similarity, ScoreMatrix};
