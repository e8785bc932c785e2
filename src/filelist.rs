use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Parse a feature list: one path per line, first comma-separated column.
pub fn parse(raw: &str, sort: bool) -> Vec<PathBuf> {
    let mut entries: Vec<&str> = raw
        .lines()
        .filter_map(|line| line.split(',').next())
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect();
    // plain string order, not path-component order
    if sort {
        entries.sort_unstable();
    }
    entries.into_iter().map(PathBuf::from).collect()
}

pub fn read(path: &Path, sort: bool) -> Result<Vec<PathBuf>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading feature list {}", path.display()))?;
    let files = parse(&raw, sort);
    if files.is_empty() {
        anyhow::bail!("feature list {} is empty", path.display());
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lines() {
        let files = parse("b/B_1.npy\n\n  a/A_1.npy  \nc/C_1.npy,extra\n", false);
        assert_eq!(
            files,
            vec![
                PathBuf::from("b/B_1.npy"),
                PathBuf::from("a/A_1.npy"),
                PathBuf::from("c/C_1.npy"),
            ]
        );
    }

    #[test]
    fn test_parse_sorted() {
        let files = parse("z/Z_1.npy\r\na/A_1.npy\r\n", true);
        assert_eq!(files, vec![PathBuf::from("a/A_1.npy"), PathBuf::from("z/Z_1.npy")]);
    }
}
