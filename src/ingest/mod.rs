//! The generic staging pipeline: walk the data root, detect each file's
//! shape, infer column types, create the staging table, and bulk-load rows,
//! recording one manifest row per file attempt.

pub mod loader;
pub mod shape;
pub mod staging;
pub mod types;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use sqlx::MySqlPool;

use crate::config::AppConfig;
use self::shape::{ALLOWED_EXTS, detect_shape};
use self::staging::{create_staging_table, table_name_for};
use self::types::infer_types;

pub const MANIFEST_TABLE: &str = "stg_load_manifest";

/// Columns below this confidence get a warning instead of silent acceptance.
const CONFIDENCE_WARN_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadSummary {
    pub loaded: usize,
    pub errors: usize,
}

/// Artifacts, archives, and documentation that must never be staged; plus
/// the WAR provider's `.txt` duplicates of files it also ships as `.csv`.
pub fn should_skip(path: &Path) -> bool {
    let lower = path.to_string_lossy().to_ascii_lowercase();
    if lower.ends_with(".zip")
        || lower.ends_with(".json")
        || lower.ends_with(".md")
        || lower.ends_with(".icloud")
    {
        return true;
    }
    let base = path
        .file_name()
        .map(|b| b.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if matches!(base.as_str(), ".ds_store" | "readme2024.txt" | "readme.txt") {
        return true;
    }
    if lower.contains("/bref_war/") && lower.ends_with(".txt") {
        return true;
    }
    false
}

fn has_allowed_ext(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ALLOWED_EXTS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Recursively collect loadable files under the data root in a stable,
/// sorted traversal order.
pub fn collect_data_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(root, &mut files)
        .with_context(|| format!("Scanning data root {}", root.display()))?;
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Reading directory {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|e| e.path())
        .collect();
    entries.sort();
    for entry in entries {
        if entry.is_dir() {
            walk(&entry, out)?;
        } else if has_allowed_ext(&entry) && !should_skip(&entry) {
            out.push(entry);
        }
    }
    Ok(())
}

pub async fn ensure_manifest_table(pool: &MySqlPool) -> Result<()> {
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id BIGINT AUTO_INCREMENT PRIMARY KEY,
            source_path TEXT,
            table_name VARCHAR(128),
            rows_loaded BIGINT,
            loaded_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            notes TEXT
        ) ENGINE=InnoDB",
        MANIFEST_TABLE
    );
    sqlx::query(&sql)
        .execute(pool)
        .await
        .context("Creating load manifest table")?;
    Ok(())
}

/// Append-only audit row; written after every file attempt, success or not.
pub async fn record_manifest(
    pool: &MySqlPool,
    source_path: &str,
    table: &str,
    rows_loaded: Option<i64>,
    notes: &str,
) -> Result<()> {
    let sql = format!(
        "INSERT INTO {} (source_path, table_name, rows_loaded, notes) VALUES (?, ?, ?, ?)",
        MANIFEST_TABLE
    );
    sqlx::query(&sql)
        .bind(source_path)
        .bind(table)
        .bind(rows_loaded)
        .bind(notes)
        .execute(pool)
        .await
        .with_context(|| format!("Recording manifest entry for {}", source_path))?;
    Ok(())
}

struct LoadedFile {
    rows: u64,
    note: String,
}

async fn load_one(
    pool: &MySqlPool,
    cfg: &AppConfig,
    path: &Path,
    table: &str,
) -> Result<LoadedFile> {
    let shape = detect_shape(path)?;
    if shape.columns.is_empty() {
        return Ok(LoadedFile {
            rows: 0,
            note: "empty file".to_string(),
        });
    }
    let inferred = infer_types(path, &shape, cfg.loader.sample_rows)?;
    for col in &inferred {
        if col.confidence > 0.0 && col.confidence < CONFIDENCE_WARN_THRESHOLD {
            log::warn!(
                "{}: column `{}` inferred {} at confidence {:.2}",
                path.display(),
                col.name,
                col.ty.sql_type(),
                col.confidence
            );
        }
    }
    create_staging_table(pool, table, &inferred).await?;
    let started = Instant::now();
    let rows = loader::load_file(pool, table, path, &shape, cfg.loader.batch_size).await?;
    Ok(LoadedFile {
        rows,
        note: format!("loaded in {:.1}s", started.elapsed().as_secs_f64()),
    })
}

/// Load every recognized file under the data root. A failing file records a
/// manifest error row and the run moves on; the summary counts both.
pub async fn run_load(pool: &MySqlPool, cfg: &AppConfig) -> Result<LoadSummary> {
    let root = &cfg.loader.data_root;
    log::info!("Scanning data root {}", root.display());
    ensure_manifest_table(pool).await?;

    let mut summary = LoadSummary::default();
    for path in collect_data_files(root)? {
        let table = table_name_for(&path, root);
        let source = path.to_string_lossy().to_string();
        log::info!("{} -> {}", source, table);
        match load_one(pool, cfg, &path, &table).await {
            Ok(done) => {
                log::info!("  loaded {} rows", done.rows);
                record_manifest(pool, &source, &table, Some(done.rows as i64), &done.note)
                    .await?;
                summary.loaded += 1;
            }
            Err(e) => {
                log::error!("  ERROR loading {}: {:#}", source, e);
                record_manifest(pool, &source, &table, None, &format!("ERROR: {:#}", e)).await?;
                summary.errors += 1;
            }
        }
    }
    log::info!(
        "Done. Files loaded: {}, errors: {}",
        summary.loaded,
        summary.errors
    );
    Ok(summary)
}

/// List every file the loader would stage, with its size and target table.
/// Needs no database connection.
pub fn run_inventory(cfg: &AppConfig) -> Result<()> {
    let root = &cfg.loader.data_root;
    let files = collect_data_files(root)?;
    let mut total_bytes: u64 = 0;
    for path in &files {
        let size = std::fs::metadata(path)
            .with_context(|| format!("Reading metadata for {}", path.display()))?
            .len();
        total_bytes += size;
        let rel = path.strip_prefix(root).unwrap_or(path);
        println!(
            "{:>12}  {}  -> {}",
            size,
            rel.display(),
            table_name_for(path, root)
        );
    }
    println!("{} file(s), {} bytes", files.len(), total_bytes);
    Ok(())
}
