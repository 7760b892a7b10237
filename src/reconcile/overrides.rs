//! Manually curated (foreign id, canonical id) override pairs.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::ingest::shape::detect_delimiter;

const HEADER_TOKENS: &[&str] = &[
    "playerid",
    "player_id",
    "bbrefid",
    "bbref_id",
    "foreign_id",
    "canonical_id",
];

fn looks_like_header(record: &csv::StringRecord) -> bool {
    record.get(1).map(str::trim).unwrap_or("").is_empty()
        || record
            .iter()
            .any(|f| HEADER_TOKENS.contains(&f.trim().to_ascii_lowercase().as_str()))
}

/// Load the override file, if configured. The file is delimited text with a
/// foreign id in the first field and a canonical id in the second; an
/// optional header row is recognized and skipped. The first occurrence of a
/// foreign id wins; a conflicting repeat is reported and ignored.
pub fn load_overrides(path: Option<&Path>) -> Result<HashMap<String, String>> {
    let mut map = HashMap::new();
    let Some(path) = path else {
        return Ok(map);
    };
    let delimiter = detect_delimiter(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Opening override file {}", path.display()))?;

    for (idx, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Reading override file {}", path.display()))?;
        if idx == 0 && looks_like_header(&record) {
            continue;
        }
        let foreign = record.get(0).map(str::trim).unwrap_or("");
        let canonical = record.get(1).map(str::trim).unwrap_or("");
        if foreign.is_empty() || canonical.is_empty() {
            log::warn!(
                "{}: line {} has no id pair; ignored",
                path.display(),
                idx + 1
            );
            continue;
        }
        if let Some(existing) = map.get(foreign) {
            if existing != canonical {
                log::warn!(
                    "{}: line {} remaps {} (kept {})",
                    path.display(),
                    idx + 1,
                    foreign,
                    existing
                );
            }
            continue;
        }
        map.insert(foreign.to_string(), canonical.to_string());
    }
    log::info!("Loaded {} override pair(s) from {}", map.len(), path.display());
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn load(contents: &str) -> HashMap<String, String> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        load_overrides(Some(&path)).unwrap()
    }

    #[test]
    fn plain_pairs_are_loaded() {
        let map = load("ruthba01,ruthba01\ncobbty01,cobbty01\n");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("ruthba01").map(String::as_str), Some("ruthba01"));
    }

    #[test]
    fn header_row_is_skipped() {
        let map = load("bbref_id,playerid\nruthba01,ruthba99\n");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("ruthba01").map(String::as_str), Some("ruthba99"));
    }

    #[test]
    fn first_occurrence_wins_on_conflict() {
        let map = load("x01,a01\nx01,b01\n");
        assert_eq!(map.get("x01").map(String::as_str), Some("a01"));
    }

    #[test]
    fn missing_config_means_empty_map() {
        assert!(load_overrides(None).unwrap().is_empty());
    }

    #[test]
    fn tab_delimited_files_work() {
        let map = load("ruthba01\truthba01\n");
        assert_eq!(map.len(), 1);
    }
}
