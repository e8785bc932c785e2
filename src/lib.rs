pub mod config;
pub mod filelist;
pub mod pipeline;
pub mod storage;

// Re-export engine types for convenience
pub use facematch_engine::{
    loader, Dataset, FeatureSet, MatchError, Matcher, PairClass, ScoreRecord,
};
