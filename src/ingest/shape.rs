//! Shape detection: delimiter, header presence, and column naming.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use crate::normalize::canonical_token;

/// Extensions the loader recognizes as delimited data.
pub const ALLOWED_EXTS: &[&str] = &["csv", "txt", "tsv", "ros", "eva", "evn"];

/// Retrosheet roster and event files carry no header row.
const HEADERLESS_EXTS: &[&str] = &["ros", "eva", "evn"];
/// UMPIRESYYYY.txt files carry no header row either.
const HEADERLESS_PREFIXES: &[&str] = &["UMPIRES"];

const DELIMITER_CANDIDATES: &[u8] = &[b',', b'\t', b';', b'|'];
const SNIFF_BYTES: usize = 4096;

/// Detected shape of one raw file. Immutable for the rest of the run.
#[derive(Debug, Clone)]
pub struct FileShape {
    pub delimiter: u8,
    pub has_header: bool,
    pub columns: Vec<String>,
}

/// Pick the candidate delimiter with the highest count in the first 4 KiB.
/// Ties and empty/short samples fall back to comma (candidates are checked
/// in order, comma first, and only a strictly larger count wins).
pub fn detect_delimiter(path: &Path) -> Result<u8> {
    let mut file = File::open(path).with_context(|| format!("Opening {}", path.display()))?;
    let mut buf = vec![0u8; SNIFF_BYTES];
    let n = file
        .read(&mut buf)
        .with_context(|| format!("Reading sample from {}", path.display()))?;
    Ok(sniff_delimiter(&buf[..n]))
}

pub(crate) fn sniff_delimiter(sample: &[u8]) -> u8 {
    let mut best = b',';
    let mut best_count = 0usize;
    for &cand in DELIMITER_CANDIDATES {
        let count = sample.iter().filter(|&&b| b == cand).count();
        if count > best_count {
            best = cand;
            best_count = count;
        }
    }
    best
}

/// Header presence is rule-based, not sniffed: known headerless extensions
/// and provider filename prefixes are headerless, everything else is assumed
/// to carry a header.
pub fn file_has_header(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if HEADERLESS_EXTS.contains(&ext.as_str()) {
        return false;
    }
    let base = path
        .file_name()
        .and_then(|b| b.to_str())
        .map(|b| b.to_ascii_uppercase())
        .unwrap_or_default();
    !HEADERLESS_PREFIXES.iter().any(|p| base.starts_with(p))
}

/// Detect delimiter, header flag, and column names for one file. An empty
/// file yields zero columns; the loader treats that as a zero-row load, not
/// an error.
pub fn detect_shape(path: &Path) -> Result<FileShape> {
    let delimiter = detect_delimiter(path)?;
    let has_header = file_has_header(path);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Opening {}", path.display()))?;

    let mut first = csv::ByteRecord::new();
    let got = reader
        .read_byte_record(&mut first)
        .with_context(|| format!("Reading first row of {}", path.display()))?;

    let columns = if !got {
        Vec::new()
    } else if has_header {
        header_columns(&first)
    } else {
        positional_columns(first.len())
    };

    Ok(FileShape {
        delimiter,
        has_header,
        columns,
    })
}

/// Synthesize `c1..cN` names from the first row's width.
pub fn positional_columns(width: usize) -> Vec<String> {
    (1..=width).map(|i| format!("c{}", i)).collect()
}

/// Canonicalize each header cell and de-duplicate collisions with `_2`,
/// `_3`, ... suffixes. An unusable cell becomes `col`.
pub fn header_columns(record: &csv::ByteRecord) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut cols = Vec::with_capacity(record.len());
    for field in record.iter() {
        let raw = String::from_utf8_lossy(field);
        let mut name = canonical_token(&raw);
        if name.is_empty() {
            name = "col".to_string();
        }
        let base = name.clone();
        let mut i = 2;
        while seen.contains(&name) {
            name = format!("{}_{}", base, i);
            i += 1;
        }
        seen.insert(name.clone());
        cols.push(name);
    }
    cols
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn sniffs_common_delimiters() {
        assert_eq!(sniff_delimiter(b"a,b,c\n1,2,3\n"), b',');
        assert_eq!(sniff_delimiter(b"a\tb\tc\n"), b'\t');
        assert_eq!(sniff_delimiter(b"a;b;c\n"), b';');
        assert_eq!(sniff_delimiter(b"a|b|c\n"), b'|');
    }

    #[test]
    fn ambiguous_sample_defaults_to_comma() {
        assert_eq!(sniff_delimiter(b""), b',');
        assert_eq!(sniff_delimiter(b"justoneword\n"), b',');
    }

    #[test]
    fn roster_and_event_files_are_headerless() {
        assert!(!file_has_header(Path::new("data/rosters/wse1924.ros")));
        assert!(!file_has_header(Path::new("data/events/1924wse.eva")));
        assert!(!file_has_header(Path::new("UMPIRES1924.txt")));
        assert!(!file_has_header(Path::new("umpires1924.TXT")));
        assert!(file_has_header(Path::new("people.csv")));
        assert!(file_has_header(Path::new("gl1924.txt")));
    }

    #[test]
    fn headerless_columns_are_positional() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "wse1924.ros", "adamb101,Adams,Babe,R,R,WSE,\n");
        let shape = detect_shape(&path).unwrap();
        assert!(!shape.has_header);
        assert_eq!(
            shape.columns,
            vec!["c1", "c2", "c3", "c4", "c5", "c6", "c7"]
        );
    }

    #[test]
    fn header_cells_are_canonicalized_and_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "t.csv", "Player ID,Team,Team,%%\nx,y,z,w\n");
        let shape = detect_shape(&path).unwrap();
        assert!(shape.has_header);
        assert_eq!(shape.columns, vec!["player_id", "team", "team_2", "col"]);
    }

    #[test]
    fn empty_file_yields_zero_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "empty.csv", "");
        let shape = detect_shape(&path).unwrap();
        assert!(shape.columns.is_empty());
    }
}
