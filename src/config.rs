use anyhow::{Context, Result};
use facematch_engine::extract::{DEFAULT_PRECISION, MAX_PRECISION};
use facematch_engine::{matcher::DEFAULT_MAX_CELLS, Dataset};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub static CONFIG_PATH: Lazy<&'static Path> =
    Lazy::new(|| Path::new(option_env!("FACEMATCH_CONFIG_PATH").unwrap_or("facematch.toml")));

/// On-disk encoding of the genuine/impostor score lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `(n, 3)` float64 `.npy` tables
    #[default]
    Npy,
    /// postcard-encoded `Vec<ScoreRecord>`
    Postcard,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Npy => "npy",
            OutputFormat::Postcard => "bin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dataset: Dataset,
    /// Loader threads; half the logical cores when unset.
    pub workers: Option<usize>,
    /// Decimal digits kept in persisted scores, at most 15.
    pub precision: u32,
    pub max_cells: u64,
    pub format: OutputFormat,
    pub sort_inputs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset: Dataset::Default,
            workers: None,
            precision: DEFAULT_PRECISION,
            max_cells: DEFAULT_MAX_CELLS,
            format: OutputFormat::Npy,
            sort_inputs: true,
        }
    }
}

impl Config {
    pub fn workers(&self) -> usize {
        self.workers
            .filter(|&n| n > 0)
            .unwrap_or_else(facematch_engine::loader::default_workers)
    }

    pub fn validate(&self) -> Result<()> {
        if self.precision > MAX_PRECISION {
            anyhow::bail!(
                "precision {} exceeds the {} digits a float64 holds",
                self.precision,
                MAX_PRECISION
            );
        }
        Ok(())
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    cfg.validate().with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
