//! Staging table naming and idempotent creation.

use std::path::Path;

use anyhow::{Context, Result};
use sqlx::MySqlPool;

use super::types::InferredColumn;
use crate::db::schema::validate_ident;
use crate::normalize::canonical_token;

/// Every staging table carries this prefix.
pub const TABLE_PREFIX: &str = "stg_";

const IDENT_MAX: usize = 64;

/// Canonical names for recognized provider files; anything else derives its
/// name from the relative path.
const CANON: &[(&str, &str)] = &[
    ("people.csv", "lahman_people"),
    ("batting.csv", "lahman_batting"),
    ("pitching.csv", "lahman_pitching"),
    ("fielding.csv", "lahman_fielding"),
    ("teams.csv", "lahman_teams"),
    ("teamsfranchises.csv", "lahman_teams_franchises"),
    ("allstarfull.csv", "lahman_allstarfull"),
    ("managers.csv", "lahman_managers"),
    ("awardsplayers.csv", "lahman_awards_players"),
    ("salaries.csv", "lahman_salaries"),
    ("schools.csv", "lahman_schools"),
    ("halloffame.csv", "lahman_halloffame"),
    ("allplayers.csv", "retrosheet_allplayers"),
    ("batting.csv_rs", "retrosheet_batting"),
    ("pitching.csv_rs", "retrosheet_pitching"),
    ("fielding.csv_rs", "retrosheet_fielding"),
    ("plays.csv", "retrosheet_plays"),
    ("gameinfo.csv", "retrosheet_gameinfo"),
    ("teamstats.csv", "retrosheet_teamstats"),
    ("war_daily_bat.csv", "bref_war_daily_bat"),
    ("war_daily_pitch.csv", "bref_war_daily_pitch"),
];

/// Derive the staging table name for a file. Known provider filenames map
/// through the canonical table; Retrosheet's batting/pitching/fielding
/// exports are keyed apart from Lahman's identically-named files by their
/// `retrosheet/csv/` location. Gamelog files (`gl<yyyy>` in the base name)
/// get a year suffix so per-year files cannot collide.
pub fn table_name_for(path: &Path, data_root: &Path) -> String {
    let rel = path.strip_prefix(data_root).unwrap_or(path);
    let rel_str = rel.to_string_lossy().replace('\\', "/");
    let base = path
        .file_name()
        .map(|b| b.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    let mut key = base.clone();
    if rel_str.to_ascii_lowercase().contains("retrosheet/csv/")
        && matches!(base.as_str(), "batting.csv" | "pitching.csv" | "fielding.csv")
    {
        key.push_str("_rs");
    }

    let mut name = CANON
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| (*v).to_string())
        .unwrap_or_else(|| canonical_token(&rel_str));
    if let Some(stripped) = name.strip_prefix("data_") {
        name = stripped.to_string();
    }

    if let Some(year) = gamelog_year(&base)
        && !name.ends_with(&year)
    {
        name = format!("{}_{}", name, year);
    }

    let mut full = format!("{}{}", TABLE_PREFIX, name);
    full.truncate(IDENT_MAX);
    full
}

/// Find a `gl` token immediately followed by four digits, e.g. `gl1924.txt`.
fn gamelog_year(base: &str) -> Option<String> {
    let b = base.as_bytes();
    for i in 0..b.len().saturating_sub(5) {
        if b[i] == b'g' && b[i + 1] == b'l' && b[i + 2..i + 6].iter().all(|c| c.is_ascii_digit()) {
            return Some(base[i + 2..i + 6].to_string());
        }
    }
    None
}

/// `CREATE TABLE IF NOT EXISTS` with the inferred column list. An existing
/// table with a different shape is reused as-is; staging schemas are never
/// altered after creation.
pub async fn create_staging_table(
    pool: &MySqlPool,
    table: &str,
    columns: &[InferredColumn],
) -> Result<()> {
    validate_ident(table)?;
    for col in columns {
        validate_ident(&col.name)?;
    }
    let col_defs = columns
        .iter()
        .map(|c| format!("`{}` {}", c.name, c.ty.sql_type()))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS `{}` ({}) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
        table, col_defs
    );
    sqlx::query(&sql)
        .execute(pool)
        .await
        .with_context(|| format!("Creating staging table {}", table))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn name(rel: &str) -> String {
        let root = PathBuf::from("/data");
        table_name_for(&root.join(rel), &root)
    }

    #[test]
    fn canonical_files_map_to_provider_names() {
        assert_eq!(name("lahman/people.csv"), "stg_lahman_people");
        assert_eq!(name("bref_war/war_daily_bat.csv"), "stg_bref_war_daily_bat");
    }

    #[test]
    fn retrosheet_stat_files_are_keyed_apart_from_lahman() {
        assert_eq!(name("lahman/batting.csv"), "stg_lahman_batting");
        assert_eq!(name("retrosheet/csv/batting.csv"), "stg_retrosheet_batting");
    }

    #[test]
    fn unrecognized_files_derive_from_relative_path() {
        // Roster shards live under a nested rosters/rosters/ directory; the
        // derived name is what the shard merger later discovers.
        assert_eq!(
            name("retrosheet/rosters/rosters/wse1924.ros"),
            "stg_retrosheet_rosters_rosters_wse1924_ros"
        );
    }

    #[test]
    fn gamelog_files_get_a_year_suffix_once() {
        assert_eq!(name("gamelogs/gl1924.txt"), "stg_gamelogs_gl1924_txt_1924");
        // Name already ending in the year is left alone.
        let n = name("gamelogs/gl1924.txt");
        assert!(n.ends_with("1924"));
        assert!(!n.ends_with("1924_1924"));
    }

    #[test]
    fn names_fit_the_identifier_limit() {
        let deep = "a/".repeat(60) + "file.csv";
        assert!(name(&deep).len() <= 64);
    }
}
