use crate::config::OutputFormat;
use anyhow::{Context, Result};
use facematch_engine::{npy, ScoreRecord};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Run statistics written next to the score lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub group: String,
    pub dataset: String,
    pub probe_count: usize,
    pub gallery_count: usize,
    pub probe_equals_gallery: bool,
    pub genuine: usize,
    pub impostor: usize,
    pub excluded: usize,
    pub elapsed_ms: u128,
}

/// File names of one group's outputs inside the output directory.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    dir: PathBuf,
    group: String,
    format: OutputFormat,
}

impl OutputPaths {
    pub fn new(dir: &Path, group: &str, format: OutputFormat) -> Self {
        Self {
            dir: dir.to_path_buf(),
            group: group.to_string(),
            format,
        }
    }

    pub fn genuine(&self) -> PathBuf {
        self.dir.join(format!("{}_genuine.{}", self.group, self.format.extension()))
    }

    pub fn impostor(&self) -> PathBuf {
        self.dir.join(format!("{}_impostor.{}", self.group, self.format.extension()))
    }

    pub fn labels(&self) -> PathBuf {
        self.dir.join(format!("{}_labels.txt", self.group))
    }

    pub fn gallery_labels(&self) -> PathBuf {
        self.dir.join(format!("{}_gallery_labels.txt", self.group))
    }

    pub fn summary(&self) -> PathBuf {
        self.dir.join(format!("{}_summary.json", self.group))
    }
}

/// Stream `count` records into `path` without buffering them.
///
/// The header (npy shape or postcard length prefix) is written first, so
/// `records` must yield exactly `count` items.
pub fn save_scores<I>(path: &Path, count: usize, records: I, format: OutputFormat) -> Result<()>
where
    I: IntoIterator<Item = ScoreRecord>,
{
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(file);
    match format {
        OutputFormat::Npy => npy::write_f64_header(&mut w, count, 3)?,
        // same bytes as the length prefix of a postcard Vec
        OutputFormat::Postcard => w.write_all(&postcard::to_allocvec(&(count as u64))?)?,
    }

    let mut written = 0;
    for record in records {
        match format {
            OutputFormat::Npy => {
                for value in record.to_row() {
                    w.write_all(&value.to_le_bytes())?;
                }
            }
            OutputFormat::Postcard => w.write_all(&postcard::to_allocvec(&record)?)?,
        }
        written += 1;
    }
    if written != count {
        anyhow::bail!("{}: expected {} pairs, got {}", path.display(), count, written);
    }
    w.flush().with_context(|| format!("writing {}", path.display()))?;
    log::info!("Saved {} pairs to {}", count, path.display());
    Ok(())
}

pub fn load_scores(path: &Path, format: OutputFormat) -> Result<Vec<ScoreRecord>> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    match format {
        OutputFormat::Npy => {
            let (_, cols, values) = npy::decode_f64_table(&data)
                .map_err(|reason| anyhow::anyhow!("{}: {}", path.display(), reason))?;
            if cols != 3 {
                anyhow::bail!("{}: expected 3 columns, found {}", path.display(), cols);
            }
            Ok(values
                .chunks_exact(3)
                .map(|row| ScoreRecord {
                    probe_index: row[0] as u32,
                    gallery_index: row[1] as u32,
                    score: row[2],
                })
                .collect())
        }
        OutputFormat::Postcard => Ok(postcard::from_bytes(&data)?),
    }
}

/// Write `"<index> <label>"` lines, one per row of the matrix.
pub fn save_labels(path: &Path, labels: &[String]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(file);
    for (index, label) in labels.iter().enumerate() {
        writeln!(w, "{} {}", index, label)?;
    }
    w.flush().with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    raw.lines()
        .enumerate()
        .map(|(expected, line)| -> Result<String> {
            let (index, label) = line
                .split_once(' ')
                .with_context(|| format!("{}: malformed line {:?}", path.display(), line))?;
            if index.parse::<usize>().ok() != Some(expected) {
                anyhow::bail!("{}: line {} has index {}", path.display(), expected, index);
            }
            Ok(label.to_string())
        })
        .collect()
}

pub fn save_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let data = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, data).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
