//! Sampling type inference over a file's leading rows.
//!
//! Pure in the sense of the same sample always producing the same result:
//! for a fixed file and sample cap the output is deterministic, and every
//! column carries a confidence ratio so callers can log weak inferences
//! instead of silently accepting them.

use std::path::Path;

use anyhow::{Context, Result};

use super::shape::FileShape;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    BigInt,
    Decimal,
    Date,
    Text,
}

impl ColumnType {
    /// Column definition fragment for staging DDL. Everything is nullable;
    /// staging keeps rows as close to the raw file as typing allows.
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::BigInt => "BIGINT NULL",
            ColumnType::Decimal => "DECIMAL(20,6) NULL",
            ColumnType::Date => "DATE NULL",
            ColumnType::Text => "VARCHAR(255) NULL",
        }
    }
}

#[derive(Debug, Clone)]
pub struct InferredColumn {
    pub name: String,
    pub ty: ColumnType,
    /// Share of classified sample values that matched the winning category,
    /// in `[0,1]`. Zero when the column had no non-blank samples.
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    ints: usize,
    decs: usize,
    dates: usize,
    other: usize,
}

impl Tally {
    fn update(&mut self, value: &str) {
        let v = value.trim();
        if v.is_empty() || v.eq_ignore_ascii_case("null") {
            return;
        }
        if is_integer_token(v) {
            self.ints += 1;
        } else if is_decimal_token(v) {
            self.decs += 1;
        } else if is_date_token(v) {
            self.dates += 1;
        } else {
            self.other += 1;
        }
    }

    fn total(&self) -> usize {
        self.ints + self.decs + self.dates + self.other
    }

    /// Priority on ties: date, then decimal, then integer, else text.
    fn decide(&self) -> (ColumnType, f64) {
        let total = self.total();
        if total == 0 {
            return (ColumnType::Text, 0.0);
        }
        let max = self
            .ints
            .max(self.decs)
            .max(self.dates)
            .max(self.other);
        let (ty, winner) = if self.dates >= max {
            (ColumnType::Date, self.dates)
        } else if self.decs >= max {
            (ColumnType::Decimal, self.decs)
        } else if self.ints >= max {
            (ColumnType::BigInt, self.ints)
        } else {
            (ColumnType::Text, self.other)
        };
        (ty, winner as f64 / total as f64)
    }
}

fn is_integer_token(v: &str) -> bool {
    let digits = v.strip_prefix('-').unwrap_or(v);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// `-?digits.digits*` — a trailing-dot literal like `12.` counts.
fn is_decimal_token(v: &str) -> bool {
    let body = v.strip_prefix('-').unwrap_or(v);
    let Some((int_part, frac_part)) = body.split_once('.') else {
        return false;
    };
    !int_part.is_empty()
        && int_part.bytes().all(|b| b.is_ascii_digit())
        && frac_part.bytes().all(|b| b.is_ascii_digit())
}

/// `YYYY-MM-DD`, `YYYY/MM/DD`, or compact `YYYYMMDD`, and the digits must
/// form a real calendar date.
fn is_date_token(v: &str) -> bool {
    fn take_digits(b: &[u8], i: &mut usize, n: usize) -> Option<u32> {
        if *i + n > b.len() || !b[*i..*i + n].iter().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let value = b[*i..*i + n]
            .iter()
            .fold(0u32, |acc, c| acc * 10 + u32::from(c - b'0'));
        *i += n;
        Some(value)
    }
    let b = v.as_bytes();
    let mut i = 0usize;
    let Some(year) = take_digits(b, &mut i, 4) else {
        return false;
    };
    if i < b.len() && (b[i] == b'-' || b[i] == b'/') {
        i += 1;
    }
    let Some(month) = take_digits(b, &mut i, 2) else {
        return false;
    };
    if i < b.len() && (b[i] == b'-' || b[i] == b'/') {
        i += 1;
    }
    let Some(day) = take_digits(b, &mut i, 2) else {
        return false;
    };
    i == b.len() && chrono::NaiveDate::from_ymd_opt(year as i32, month, day).is_some()
}

/// Tally up to `sample_rows` data rows and classify every column of `shape`.
/// Blank and literal NULL tokens never count; ragged rows contribute only
/// the fields they have.
pub fn infer_types(
    path: &Path,
    shape: &FileShape,
    sample_rows: usize,
) -> Result<Vec<InferredColumn>> {
    let mut tallies = vec![Tally::default(); shape.columns.len()];

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(shape.delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Opening {}", path.display()))?;

    let mut record = csv::ByteRecord::new();
    let mut seen = 0usize;
    let mut skipped_header = !shape.has_header;
    while reader
        .read_byte_record(&mut record)
        .with_context(|| format!("Sampling rows of {}", path.display()))?
    {
        if !skipped_header {
            skipped_header = true;
            continue;
        }
        if seen >= sample_rows {
            break;
        }
        seen += 1;
        for (j, field) in record.iter().take(tallies.len()).enumerate() {
            tallies[j].update(&String::from_utf8_lossy(field));
        }
    }

    Ok(shape
        .columns
        .iter()
        .zip(tallies.iter())
        .map(|(name, tally)| {
            let (ty, confidence) = tally.decide();
            InferredColumn {
                name: name.clone(),
                ty,
                confidence,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::shape::detect_shape;
    use std::io::Write;

    #[test]
    fn token_classifiers() {
        assert!(is_integer_token("42"));
        assert!(is_integer_token("-7"));
        assert!(!is_integer_token("4.2"));
        assert!(!is_integer_token("4a"));

        assert!(is_decimal_token("4.2"));
        assert!(is_decimal_token("-0.5"));
        assert!(is_decimal_token("12."));
        assert!(!is_decimal_token(".5"));
        assert!(!is_decimal_token("12"));

        assert!(is_date_token("1924-10-04"));
        assert!(is_date_token("1924/10/04"));
        assert!(is_date_token("19241004"));
        assert!(!is_date_token("1924-10"));
        assert!(!is_date_token("04-10-1924"));
        assert!(!is_date_token("1924-10-04x"));
        assert!(!is_date_token("1924-13-40"));
        assert!(!is_date_token("0000-00-00"));
    }

    #[test]
    fn ties_prefer_date_then_decimal_then_integer() {
        let mut t = Tally::default();
        t.update("1924-10-04");
        t.update("42");
        let (ty, conf) = t.decide();
        assert_eq!(ty, ColumnType::Date);
        assert!((conf - 0.5).abs() < 1e-9);

        let mut t = Tally::default();
        t.update("4.2");
        t.update("42");
        assert_eq!(t.decide().0, ColumnType::Decimal);
    }

    #[test]
    fn no_plurality_of_any_pattern_is_text() {
        let mut t = Tally::default();
        t.update("abc");
        t.update("def");
        t.update("42");
        let (ty, conf) = t.decide();
        assert_eq!(ty, ColumnType::Text);
        assert!((conf - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn blank_and_null_tokens_are_excluded() {
        let mut t = Tally::default();
        t.update("");
        t.update("  ");
        t.update("NULL");
        t.update("null");
        assert_eq!(t.total(), 0);
        assert_eq!(t.decide(), (ColumnType::Text, 0.0));
    }

    fn infer_file(contents: &str, name: &str, cap: usize) -> Vec<InferredColumn> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        let shape = detect_shape(&path).unwrap();
        infer_types(&path, &shape, cap).unwrap()
    }

    #[test]
    fn mixed_headerless_file_matches_expected_types() {
        // Two of three sampled rows match each pattern; pluralities win.
        let cols = infer_file(
            "1,2.5,1924-10-04\n2,3.5,1925-01-01\n3,huh,what\n",
            "mixed.ros",
            1500,
        );
        let types: Vec<ColumnType> = cols.iter().map(|c| c.ty).collect();
        assert_eq!(
            types,
            vec![ColumnType::BigInt, ColumnType::Decimal, ColumnType::Date]
        );
    }

    #[test]
    fn inference_is_deterministic_for_a_fixed_sample() {
        let contents = "id,amount,when\n1,2.5,1924-10-04\n2,3.5,1925-01-01\n";
        let a = infer_file(contents, "a.csv", 1500);
        let b = infer_file(contents, "b.csv", 1500);
        let sig = |cols: &[InferredColumn]| {
            cols.iter()
                .map(|c| (c.name.clone(), c.ty, c.confidence.to_bits()))
                .collect::<Vec<_>>()
        };
        assert_eq!(sig(&a), sig(&b));
    }

    #[test]
    fn sample_cap_bounds_the_scan() {
        // Beyond-cap rows would flip the type if they were read.
        let mut contents = String::from("v\n");
        for _ in 0..5 {
            contents.push_str("123\n");
        }
        for _ in 0..50 {
            contents.push_str("word\n");
        }
        let cols = infer_file(&contents, "capped.csv", 5);
        assert_eq!(cols[0].ty, ColumnType::BigInt);
        assert!((cols[0].confidence - 1.0).abs() < 1e-9);
    }
}
