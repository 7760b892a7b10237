//! Identifier hygiene and `information_schema` probes.
//!
//! Table and column names in this pipeline are computed at run time, so every
//! identifier that reaches a SQL string passes [`validate_ident`] first;
//! values are always bound, never interpolated.

use anyhow::{Context, Result, bail};
use sqlx::{MySqlPool, Row};

/// Accept only `[A-Za-z0-9_]+` so a computed name can be backtick-quoted
/// into dynamic SQL safely.
pub fn validate_ident(name: &str) -> Result<()> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        bail!("Invalid identifier: {}", name);
    }
    Ok(())
}

pub async fn table_exists(pool: &MySqlPool, database: &str, table: &str) -> Result<bool> {
    let row = sqlx::query(
        r#"SELECT COUNT(*) AS cnt FROM information_schema.tables
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?"#,
    )
    .bind(database)
    .bind(table)
    .fetch_one(pool)
    .await
    .with_context(|| format!("Failed to probe table {}.{}", database, table))?;
    let cnt: i64 = row.try_get("cnt")?;
    Ok(cnt > 0)
}

pub async fn column_exists(
    pool: &MySqlPool,
    database: &str,
    table: &str,
    column: &str,
) -> Result<bool> {
    let row = sqlx::query(
        r#"SELECT COUNT(*) AS cnt FROM information_schema.columns
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND COLUMN_NAME = ?"#,
    )
    .bind(database)
    .bind(table)
    .bind(column)
    .fetch_one(pool)
    .await
    .with_context(|| format!("Failed to probe column {}.{}.{}", database, table, column))?;
    let cnt: i64 = row.try_get("cnt")?;
    Ok(cnt > 0)
}

/// List table names matching a LIKE pattern. The caller supplies the pattern
/// with `_` already escaped as `\_` where a literal underscore is meant.
pub async fn list_tables_like(
    pool: &MySqlPool,
    database: &str,
    like_pattern: &str,
) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"SELECT t.TABLE_NAME AS tbl FROM information_schema.tables AS t
            WHERE t.TABLE_SCHEMA = ? AND t.TABLE_NAME LIKE ? ESCAPE '\\'
            ORDER BY t.TABLE_NAME"#,
    )
    .bind(database)
    .bind(like_pattern)
    .fetch_all(pool)
    .await
    .with_context(|| format!("Failed to list tables in {} like {}", database, like_pattern))?;
    let mut names = Vec::with_capacity(rows.len());
    for r in rows {
        names.push(r.try_get("tbl")?);
    }
    Ok(names)
}
