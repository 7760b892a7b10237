//! Structured WAR ingest: truncate-then-reload of the two
//! Baseball-Reference WAR tables from the provider's delimited files.
//!
//! The WAR provider is the source of truth for these tables, so each run
//! clears and reloads them wholesale. Numeric conversion is tolerant: an
//! empty or unparsable value loads as NULL, never as a row error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use sqlx::{MySql, MySqlPool};

use crate::config::AppConfig;
use crate::db::schema::validate_ident;
use crate::ingest::collect_data_files;

pub const BAT_TABLE: &str = "bref_war_bat";
pub const PITCH_TABLE: &str = "bref_war_pitch";

const INSERT_BATCH: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Text,
    Int,
    Num,
}

impl Kind {
    fn sql_type(&self) -> &'static str {
        match self {
            Kind::Text => "VARCHAR(120) NULL",
            Kind::Int => "INT NULL",
            Kind::Num => "DOUBLE NULL",
        }
    }
}

/// (table column, provider header, kind). `playerid` starts as the
/// provider's `player_ID` and is rewritten by reconciliation.
type WarColumn = (&'static str, &'static str, Kind);

const BAT_COLUMNS: &[WarColumn] = &[
    ("name_common", "name_common", Kind::Text),
    ("mlb_id", "mlb_ID", Kind::Text),
    ("playerid", "player_ID", Kind::Text),
    ("yearid", "year_ID", Kind::Int),
    ("team_id", "team_ID", Kind::Text),
    ("stint", "stint", Kind::Int),
    ("lg_id", "lg_ID", Kind::Text),
    ("pa", "PA", Kind::Int),
    ("g", "G", Kind::Int),
    ("inn", "Inn", Kind::Num),
    ("runs_bat", "runs_bat", Kind::Num),
    ("runs_br", "runs_br", Kind::Num),
    ("runs_dp", "runs_dp", Kind::Num),
    ("runs_field", "runs_field", Kind::Num),
    ("runs_infield", "runs_infield", Kind::Num),
    ("runs_outfield", "runs_outfield", Kind::Num),
    ("runs_catcher", "runs_catcher", Kind::Num),
    ("runs_good_plays", "runs_good_plays", Kind::Num),
    ("runs_defense", "runs_defense", Kind::Num),
    ("runs_position", "runs_position", Kind::Num),
    ("runs_position_p", "runs_position_p", Kind::Num),
    ("runs_replacement", "runs_replacement", Kind::Num),
    ("runs_above_rep", "runs_above_rep", Kind::Num),
    ("runs_above_avg", "runs_above_avg", Kind::Num),
    ("runs_above_avg_off", "runs_above_avg_off", Kind::Num),
    ("runs_above_avg_def", "runs_above_avg_def", Kind::Num),
    ("waa", "WAA", Kind::Num),
    ("waa_off", "WAA_off", Kind::Num),
    ("waa_def", "WAA_def", Kind::Num),
    ("war", "WAR", Kind::Num),
    ("war_def", "WAR_def", Kind::Num),
    ("war_off", "WAR_off", Kind::Num),
    ("war_rep", "WAR_rep", Kind::Num),
    ("salary", "salary", Kind::Num),
    ("pitcher", "pitcher", Kind::Text),
    ("team_rpg", "teamRpG", Kind::Num),
    ("opp_rpg", "oppRpG", Kind::Num),
    ("opp_rppa_rep", "oppRpPA_rep", Kind::Num),
    ("opp_rpg_rep", "oppRpG_rep", Kind::Num),
    ("pyth_exponent", "pyth_exponent", Kind::Num),
    ("pyth_exponent_rep", "pyth_exponent_rep", Kind::Num),
    ("waa_win_perc", "waa_win_perc", Kind::Num),
    ("waa_win_perc_off", "waa_win_perc_off", Kind::Num),
    ("waa_win_perc_def", "waa_win_perc_def", Kind::Num),
    ("waa_win_perc_rep", "waa_win_perc_rep", Kind::Num),
];

const PITCH_COLUMNS: &[WarColumn] = &[
    ("name_common", "name_common", Kind::Text),
    ("mlb_id", "mlb_ID", Kind::Text),
    ("playerid", "player_ID", Kind::Text),
    ("yearid", "year_ID", Kind::Int),
    ("team_id", "team_ID", Kind::Text),
    ("stint", "stint", Kind::Int),
    ("lg_id", "lg_ID", Kind::Text),
    ("g", "G", Kind::Int),
    ("gs", "GS", Kind::Int),
    ("ipouts", "IPouts", Kind::Int),
    ("ipouts_start", "IPouts_start", Kind::Int),
    ("ipouts_relief", "IPouts_relief", Kind::Int),
    ("ra", "RA", Kind::Num),
    ("xra", "xRA", Kind::Num),
    ("xra_sprp_adj", "xRA_sprp_adj", Kind::Num),
    ("xra_def_pitcher", "xRA_def_pitcher", Kind::Num),
    ("ppf", "PPF", Kind::Num),
    ("ppf_custom", "PPF_custom", Kind::Num),
    ("xra_final", "xRA_final", Kind::Num),
    ("bip", "BIP", Kind::Num),
    ("bip_perc", "BIP_perc", Kind::Num),
    ("salary", "salary", Kind::Num),
    ("runs_above_avg", "runs_above_avg", Kind::Num),
    ("runs_above_avg_adj", "runs_above_avg_adj", Kind::Num),
    ("runs_above_rep", "runs_above_rep", Kind::Num),
    ("rpo_replacement", "RpO_replacement", Kind::Num),
    ("gr_leverage_index_avg", "GR_leverage_index_avg", Kind::Num),
    ("war", "WAR", Kind::Num),
    ("salary_season", "salary_season", Kind::Num),
    ("runs_above_avg_season", "runs_above_avg_season", Kind::Num),
    ("runs_above_avg_adj_season", "runs_above_avg_adj_season", Kind::Num),
    ("runs_above_rep_season", "runs_above_rep_season", Kind::Num),
    ("war_season", "WAR_season", Kind::Num),
    ("team_rpg", "teamRpG", Kind::Num),
    ("opp_rpg", "oppRpG", Kind::Num),
    ("pyth_exponent", "pyth_exponent", Kind::Num),
    ("waa_win_perc", "waa_win_perc", Kind::Num),
    ("waa", "WAA", Kind::Num),
];

#[derive(Debug, Clone)]
enum BindValue {
    Text(Option<String>),
    Int(Option<i64>),
    Num(Option<f64>),
}

fn convert(kind: Kind, raw: Option<&str>) -> BindValue {
    let v = raw.map(str::trim).filter(|v| !v.is_empty());
    match kind {
        Kind::Text => BindValue::Text(v.map(str::to_string)),
        Kind::Int => BindValue::Int(v.and_then(|v| v.parse::<i64>().ok())),
        Kind::Num => BindValue::Num(v.and_then(|v| v.parse::<f64>().ok())),
    }
}

async fn ensure_war_table(pool: &MySqlPool, table: &str, columns: &[WarColumn]) -> Result<()> {
    validate_ident(table)?;
    let col_defs = columns
        .iter()
        .map(|(name, _, kind)| format!("`{}` {}", name, kind.sql_type()))
        .collect::<Vec<_>>()
        .join(",\n            ");
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS `{table}` (
            {col_defs},
            KEY idx_playerid (playerid),
            KEY idx_year (yearid)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
    );
    sqlx::query(&sql)
        .execute(pool)
        .await
        .with_context(|| format!("Creating WAR table {}", table))?;
    Ok(())
}

/// Locate the provider's file by base-name stem, e.g. `war_daily_bat`.
fn find_war_file(files: &[PathBuf], stem: &str) -> Option<PathBuf> {
    files
        .iter()
        .find(|p| {
            p.file_name()
                .map(|b| b.to_string_lossy().to_ascii_lowercase().starts_with(stem))
                .unwrap_or(false)
        })
        .cloned()
}

async fn flush_batch(
    pool: &MySqlPool,
    table: &str,
    columns: &[WarColumn],
    rows: &[Vec<BindValue>],
) -> Result<()> {
    let col_list = columns
        .iter()
        .map(|(name, _, _)| format!("`{}`", name))
        .collect::<Vec<_>>()
        .join(", ");
    let mut q = sqlx::QueryBuilder::<MySql>::new("INSERT INTO ");
    q.push(format!("`{}` ({}) VALUES ", table, col_list));
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
            match value {
                BindValue::Text(v) => q.push_bind(v.clone()),
                BindValue::Int(v) => q.push_bind(*v),
                BindValue::Num(v) => q.push_bind(*v),
            };
        }
        q.push(")");
    }
    q.build()
        .execute(pool)
        .await
        .with_context(|| format!("Inserting WAR batch into {}", table))?;
    Ok(())
}

async fn reload_war_table(
    pool: &MySqlPool,
    table: &str,
    columns: &[WarColumn],
    path: &Path,
) -> Result<u64> {
    ensure_war_table(pool, table, columns).await?;
    sqlx::query(&format!("TRUNCATE TABLE `{}`", table))
        .execute(pool)
        .await
        .with_context(|| format!("Truncating {}", table))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Opening {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Reading header of {}", path.display()))?;
    let index: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_ascii_lowercase(), i))
        .collect();
    if !index.contains_key("player_id") {
        bail!(
            "{} does not look like a WAR export (no player_ID column)",
            path.display()
        );
    }

    let mut total: u64 = 0;
    let mut batch: Vec<Vec<BindValue>> = Vec::with_capacity(INSERT_BATCH);
    for record in reader.records() {
        let record = record.with_context(|| format!("Reading {}", path.display()))?;
        let row: Vec<BindValue> = columns
            .iter()
            .map(|(_, source, kind)| {
                let raw = index
                    .get(&source.to_ascii_lowercase())
                    .and_then(|&i| record.get(i));
                convert(*kind, raw)
            })
            .collect();
        batch.push(row);
        if batch.len() >= INSERT_BATCH {
            flush_batch(pool, table, columns, &batch).await?;
            total += batch.len() as u64;
            batch.clear();
        }
    }
    if !batch.is_empty() {
        flush_batch(pool, table, columns, &batch).await?;
        total += batch.len() as u64;
    }
    Ok(total)
}

/// Reload both WAR tables from the data root. A missing provider file is a
/// warning, not an error, so partial drops still reconcile what exists.
pub async fn run_war_ingest(pool: &MySqlPool, cfg: &AppConfig) -> Result<()> {
    let files = collect_data_files(&cfg.loader.data_root)?;
    for (label, table, columns, stem) in [
        ("batting", BAT_TABLE, BAT_COLUMNS, "war_daily_bat"),
        ("pitching", PITCH_TABLE, PITCH_COLUMNS, "war_daily_pitch"),
    ] {
        let Some(path) = find_war_file(&files, stem) else {
            log::warn!(
                "No {} WAR file ({}*) under {}; skipping",
                label,
                stem,
                cfg.loader.data_root.display()
            );
            continue;
        };
        log::info!("Reloading {} from {}", table, path.display());
        let rows = reload_war_table(pool, table, columns, &path).await?;
        log::info!("Loaded {} {} WAR records", rows, label);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_tolerates_bad_numerics() {
        assert!(matches!(convert(Kind::Int, Some("42")), BindValue::Int(Some(42))));
        assert!(matches!(convert(Kind::Int, Some("4.2")), BindValue::Int(None)));
        assert!(matches!(convert(Kind::Int, Some("")), BindValue::Int(None)));
        assert!(matches!(convert(Kind::Int, None), BindValue::Int(None)));
        assert!(matches!(
            convert(Kind::Num, Some("-3.5")),
            BindValue::Num(Some(v)) if (v + 3.5).abs() < 1e-12
        ));
        assert!(matches!(convert(Kind::Num, Some("n/a")), BindValue::Num(None)));
    }

    #[test]
    fn text_values_are_trimmed_and_empty_is_null() {
        assert!(matches!(
            convert(Kind::Text, Some(" ruthba01 ")),
            BindValue::Text(Some(ref v)) if v == "ruthba01"
        ));
        assert!(matches!(convert(Kind::Text, Some("  ")), BindValue::Text(None)));
    }

    #[test]
    fn column_tables_keep_the_identity_fields_first() {
        for cols in [BAT_COLUMNS, PITCH_COLUMNS] {
            assert_eq!(cols[2].0, "playerid");
            assert_eq!(cols[2].1, "player_ID");
            assert_eq!(cols[3].0, "yearid");
        }
    }

    #[test]
    fn war_file_lookup_matches_by_stem() {
        let files = vec![
            PathBuf::from("/d/bref_war/war_daily_bat.csv"),
            PathBuf::from("/d/bref_war/war_daily_pitch.csv"),
        ];
        assert_eq!(
            find_war_file(&files, "war_daily_pitch"),
            Some(PathBuf::from("/d/bref_war/war_daily_pitch.csv"))
        );
        assert_eq!(find_war_file(&files, "war_daily_field"), None);
    }
}
