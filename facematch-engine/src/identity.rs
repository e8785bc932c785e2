use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::MatchError;

/// Dataset naming convention used to recover a subject identity from a
/// feature file path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(into = "String")]
pub enum Dataset {
    /// `<subject>_<anything>.npy`
    #[default]
    Default,
    /// First `n` characters of the file name.
    Prefix(usize),
    /// File name minus its last five characters.
    Chiya,
    /// Feature label minus its first character and last four characters.
    ChiyaVal,
    /// `<anything>_<subject>_<anything>.npy`
    AgeDb,
    /// Samples are grouped in one directory per subject. Carries the
    /// dataset name it was selected by, e.g. `VGGFACE2`.
    ParentDir(&'static str),
}

const PARENT_DIR_NAMES: &[&str] = &["PUBLIC_IVS", "VGGFACE2", "ASIANCELEB", "BA-TEST", "BFW"];

impl FromStr for Dataset {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_uppercase();
        if let Some(n) = name.strip_prefix("PREFIX:") {
            return match n.parse::<usize>() {
                Ok(n) if n > 0 => Ok(Dataset::Prefix(n)),
                _ => Err(MatchError::UnknownDataset(s.to_string())),
            };
        }
        match name.as_str() {
            "DEFAULT" => Ok(Dataset::Default),
            "CHIYA" => Ok(Dataset::Chiya),
            "CHIYA_VAL" => Ok(Dataset::ChiyaVal),
            "AGEDB" => Ok(Dataset::AgeDb),
            other => PARENT_DIR_NAMES
                .iter()
                .copied()
                .find(|known| *known == other)
                .map(Dataset::ParentDir)
                .ok_or_else(|| MatchError::UnknownDataset(s.to_string())),
        }
    }
}

impl TryFrom<String> for Dataset {
    type Error = MatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// Hand-written equivalent of `#[serde(try_from = "String")]`: the derived
// impl would inherit a `'de: 'static` bound from the `&'static str` field.
impl<'de> Deserialize<'de> for Dataset {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Dataset::try_from(value).map_err(serde::de::Error::custom)
    }
}

impl From<Dataset> for String {
    fn from(value: Dataset) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dataset::Default => f.write_str("DEFAULT"),
            Dataset::Prefix(n) => write!(f, "PREFIX:{n}"),
            Dataset::Chiya => f.write_str("CHIYA"),
            Dataset::ChiyaVal => f.write_str("CHIYA_VAL"),
            Dataset::AgeDb => f.write_str("AGEDB"),
            Dataset::ParentDir(name) => f.write_str(name),
        }
    }
}

/// Identity of one feature file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject_id: String,
    /// `<parent dir>/<file stem>`, unique per physical sample.
    pub feature_label: String,
}

impl Dataset {
    /// Resolve the subject identity and feature label of `path`.
    ///
    /// Pure string manipulation; the file is never touched.
    pub fn resolve(&self, path: &Path) -> Identity {
        let basename = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let feature_label = if parent.is_empty() {
            stem
        } else {
            format!("{parent}/{stem}")
        };

        let subject_id = match self {
            Dataset::Default => basename.split('_').next().unwrap_or_default().to_string(),
            Dataset::Prefix(n) => basename.chars().take(*n).collect(),
            Dataset::Chiya => char_slice(&basename, 0, 5),
            Dataset::ChiyaVal => char_slice(&feature_label, 1, 4),
            Dataset::AgeDb => basename.split('_').nth(1).unwrap_or_default().to_string(),
            Dataset::ParentDir(_) => parent,
        };

        Identity {
            subject_id,
            feature_label,
        }
    }
}

/// Drop `head` chars from the front and `tail` chars from the back.
fn char_slice(s: &str, head: usize, tail: usize) -> String {
    let len = s.chars().count();
    let end = len.saturating_sub(tail);
    if head >= end {
        return String::new();
    }
    s.chars().skip(head).take(end - head).collect()
}
