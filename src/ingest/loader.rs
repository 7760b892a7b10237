//! Batched row loading into a staging table.

use std::path::Path;

use anyhow::{Context, Result};
use sqlx::{MySql, MySqlPool};

use super::shape::FileShape;
use crate::db::schema::validate_ident;

/// Pad or truncate a raw record to the expected width and normalize missing
/// values: empty strings and the literal token `NULL` become SQL NULL.
pub fn normalize_row(fields: Vec<String>, width: usize) -> Vec<Option<String>> {
    let mut out: Vec<Option<String>> = fields
        .into_iter()
        .take(width)
        .map(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect();
    while out.len() < width {
        out.push(None);
    }
    out
}

fn insert_builder<'a>(table: &str, columns: &[String]) -> sqlx::QueryBuilder<'a, MySql> {
    let col_list = columns
        .iter()
        .map(|c| format!("`{}`", c))
        .collect::<Vec<_>>()
        .join(", ");
    let mut q = sqlx::QueryBuilder::<MySql>::new("INSERT INTO ");
    q.push(format!("`{}` ({}) VALUES ", table, col_list));
    q
}

/// Stream the file into `table` in multi-row parameterized batches. Returns
/// the exact number of rows inserted. Ragged rows are padded or truncated,
/// never rejected; the header row, when present, is skipped.
pub async fn load_file(
    pool: &MySqlPool,
    table: &str,
    path: &Path,
    shape: &FileShape,
    batch_size: usize,
) -> Result<u64> {
    validate_ident(table)?;
    for col in &shape.columns {
        validate_ident(col)?;
    }
    if shape.columns.is_empty() {
        return Ok(0);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(shape.delimiter)
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Opening {}", path.display()))?;

    let width = shape.columns.len();
    let mut total: u64 = 0;
    let mut batch: Vec<Vec<Option<String>>> = Vec::with_capacity(batch_size);

    let mut record = csv::ByteRecord::new();
    let mut skipped_header = !shape.has_header;
    while reader
        .read_byte_record(&mut record)
        .with_context(|| format!("Reading {}", path.display()))?
    {
        if !skipped_header {
            skipped_header = true;
            continue;
        }
        let fields = record
            .iter()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect();
        batch.push(normalize_row(fields, width));
        if batch.len() >= batch_size {
            flush_batch(pool, table, &shape.columns, &batch).await?;
            total += batch.len() as u64;
            batch.clear();
        }
    }
    if !batch.is_empty() {
        flush_batch(pool, table, &shape.columns, &batch).await?;
        total += batch.len() as u64;
    }
    Ok(total)
}

async fn flush_batch(
    pool: &MySqlPool,
    table: &str,
    columns: &[String],
    rows: &[Vec<Option<String>>],
) -> Result<()> {
    let mut q = insert_builder(table, columns);
    let mut first = true;
    for row in rows {
        if !first {
            q.push(", ");
        }
        first = false;
        q.push("(");
        for (j, value) in row.iter().enumerate() {
            if j > 0 {
                q.push(", ");
            }
            q.push_bind(value.clone());
        }
        q.push(")");
    }
    q.build()
        .execute(pool)
        .await
        .with_context(|| format!("Inserting batch of {} rows into {}", rows.len(), table))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn short_rows_are_padded_with_nulls() {
        let out = normalize_row(row(&["a", "b"]), 4);
        assert_eq!(
            out,
            vec![Some("a".into()), Some("b".into()), None, None]
        );
    }

    #[test]
    fn long_rows_are_truncated() {
        let out = normalize_row(row(&["a", "b", "c"]), 2);
        assert_eq!(out, vec![Some("a".into()), Some("b".into())]);
    }

    #[test]
    fn blank_and_null_tokens_become_sql_null() {
        let out = normalize_row(row(&["", "  ", "NULL", "null", "0"]), 5);
        assert_eq!(out, vec![None, None, None, None, Some("0".into())]);
    }

    #[test]
    fn values_are_trimmed() {
        let out = normalize_row(row(&[" x "]), 1);
        assert_eq!(out, vec![Some("x".into())]);
    }
}
