//! Consolidate per-team-per-year Retrosheet roster shards.
//!
//! The generic loader leaves one small staging table per `<team><year>.ros`
//! file. This pass folds them into one table per team (plus one global
//! umpire table), stamping each row with its season and role, and drops the
//! shards — but only after the merge transaction has committed, so a failed
//! run leaves every shard intact for retry.

use anyhow::{Context, Result};
use sqlx::{MySql, MySqlPool, Row, Transaction};

use crate::config::AppConfig;
use crate::db::schema::{list_tables_like, validate_ident};

pub const SHARD_PREFIX: &str = "stg_retrosheet_rosters_rosters_";
pub const SHARD_SUFFIX: &str = "_ros";
pub const TEAM_TABLE_PREFIX: &str = "stg_rs_rosters_team_";
pub const UMPIRE_TABLE: &str = "stg_rs_rosters_umpires";

/// Parse `<code3><yyyy>` out of a shard table name. Anything that does not
/// match exactly is not a shard.
pub fn parse_team_year(table_name: &str) -> Option<(String, i32)> {
    let rest = table_name.strip_prefix(SHARD_PREFIX)?;
    let middle = rest.strip_suffix(SHARD_SUFFIX)?;
    if middle.len() != 7 {
        return None;
    }
    let (code, year) = middle.split_at(3);
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    if !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((code.to_ascii_lowercase(), year.parse().ok()?))
}

/// Umpire crews are routed to the global umpire table rather than a team.
pub fn is_umpire_shard(table_name: &str, code: &str) -> bool {
    table_name.to_ascii_uppercase().contains("UMP") || code == "ump"
}

async fn ensure_team_table(pool: &MySqlPool, code: &str) -> Result<String> {
    let table = format!("{}{}", TEAM_TABLE_PREFIX, code);
    validate_ident(&table)?;
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS `{table}` (
            retro_id   VARCHAR(16) NOT NULL,
            last_name  VARCHAR(64) NOT NULL,
            first_name VARCHAR(64) NOT NULL,
            bats       CHAR(1) NULL,
            throws     CHAR(1) NULL,
            team_code  VARCHAR(8) NULL,
            debut_date DATE NULL,
            role       ENUM('PLAYER','UMPIRE') NOT NULL,
            year_guess INT NOT NULL,
            load_ts    TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (retro_id, year_guess, role),
            KEY idx_role_year (role, year_guess),
            KEY idx_last_first (last_name, first_name)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
    );
    sqlx::query(&sql)
        .execute(pool)
        .await
        .with_context(|| format!("Creating team roster table {}", table))?;
    Ok(table)
}

async fn ensure_umpire_table(pool: &MySqlPool) -> Result<()> {
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS `{UMPIRE_TABLE}` (
            retro_id   VARCHAR(16) NOT NULL,
            last_name  VARCHAR(64) NOT NULL,
            first_name VARCHAR(64) NOT NULL,
            crew_code  VARCHAR(16) NULL,
            year_guess INT NOT NULL,
            load_ts    TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (retro_id, year_guess),
            KEY idx_year (year_guess),
            KEY idx_last_first (last_name, first_name)
        ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
    );
    sqlx::query(&sql)
        .execute(pool)
        .await
        .context("Creating umpire roster table")?;
    Ok(())
}

/// Shard columns are positional: c1 retro_id, c2 last, c3 first, c4 bats,
/// c5 throws, c6 team/crew code, c7 debut date in ISO or compact form.
fn team_merge_sql(dest: &str, shard: &str) -> String {
    format!(
        "INSERT IGNORE INTO `{dest}`
            (retro_id, last_name, first_name, bats, throws, team_code, debut_date, role, year_guess)
         SELECT c1, c2, c3, c4, c5, c6,
            CASE
                WHEN c7 IS NULL OR c7 = '' OR c7 = '0000-00-00' THEN NULL
                WHEN c7 REGEXP '^[0-9]{{4}}-[0-9]{{2}}-[0-9]{{2}}$' THEN STR_TO_DATE(c7, '%Y-%m-%d')
                WHEN c7 REGEXP '^[0-9]{{8}}$' THEN STR_TO_DATE(c7, '%Y%m%d')
                ELSE NULL
            END,
            ?, ?
         FROM `{shard}`"
    )
}

fn umpire_merge_sql(shard: &str) -> String {
    format!(
        "INSERT IGNORE INTO `{UMPIRE_TABLE}`
            (retro_id, last_name, first_name, crew_code, year_guess)
         SELECT c1, c2, c3, c6, ?
         FROM `{shard}`"
    )
}

async fn merge_shard_into_team(
    tx: &mut Transaction<'_, MySql>,
    shard: &str,
    dest: &str,
    year: i32,
) -> Result<()> {
    validate_ident(shard)?;
    sqlx::query(&team_merge_sql(dest, shard))
        .bind("PLAYER")
        .bind(year)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("Merging {} into {}", shard, dest))?;
    Ok(())
}

async fn merge_shard_into_umpires(
    tx: &mut Transaction<'_, MySql>,
    shard: &str,
    year: i32,
) -> Result<()> {
    validate_ident(shard)?;
    sqlx::query(&umpire_merge_sql(shard))
        .bind(year)
        .execute(&mut **tx)
        .await
        .with_context(|| format!("Merging {} into {}", shard, UMPIRE_TABLE))?;
    Ok(())
}

async fn count_rows(pool: &MySqlPool, table: &str) -> Result<i64> {
    validate_ident(table)?;
    let row = sqlx::query(&format!("SELECT COUNT(*) AS cnt FROM `{}`", table))
        .fetch_one(pool)
        .await?;
    Ok(row.try_get("cnt")?)
}

async fn drop_shard(pool: &MySqlPool, table: &str) -> Result<()> {
    validate_ident(table)?;
    sqlx::query(&format!("DROP TABLE IF EXISTS `{}`", table))
        .execute(pool)
        .await
        .with_context(|| format!("Dropping shard {}", table))?;
    Ok(())
}

pub async fn run_merge(pool: &MySqlPool, cfg: &AppConfig) -> Result<()> {
    // Literal underscores in the prefix/suffix must be escaped in LIKE.
    let like_pattern = format!(
        "{}%{}",
        SHARD_PREFIX.replace('_', "\\_"),
        SHARD_SUFFIX.replace('_', "\\_")
    );
    let shard_names = list_tables_like(pool, &cfg.database.database, &like_pattern).await?;
    log::info!("Discovered {} shard table(s)", shard_names.len());
    if shard_names.is_empty() {
        log::info!("No roster shard tables found; nothing to do");
        return Ok(());
    }

    let mut by_team: std::collections::BTreeMap<String, Vec<(String, i32)>> = Default::default();
    let mut umpire_shards: Vec<(String, i32)> = Vec::new();
    let mut bad: Vec<String> = Vec::new();
    for name in shard_names {
        match parse_team_year(&name) {
            Some((code, year)) if is_umpire_shard(&name, &code) => {
                umpire_shards.push((name, year));
            }
            Some((code, year)) => by_team.entry(code).or_default().push((name, year)),
            None => bad.push(name),
        }
    }
    for name in &bad {
        log::warn!("Skipping table with unexpected shard name: {}", name);
    }

    // Destination DDL runs before the merge transaction (MySQL DDL would
    // implicitly commit it anyway).
    if !umpire_shards.is_empty() {
        ensure_umpire_table(pool).await?;
    }
    let mut team_tables: std::collections::BTreeMap<String, String> = Default::default();
    for code in by_team.keys() {
        team_tables.insert(code.clone(), ensure_team_table(pool, code).await?);
    }

    let mut to_drop_after_commit: Vec<String> = Vec::new();
    let mut tx = pool.begin().await.context("Opening merge transaction")?;

    umpire_shards.sort_by_key(|(_, year)| *year);
    for (shard, year) in &umpire_shards {
        log::info!("merging {} -> {} (year={})", shard, UMPIRE_TABLE, year);
        merge_shard_into_umpires(&mut tx, shard, *year).await?;
        to_drop_after_commit.push(shard.clone());
    }

    for (code, shards) in &mut by_team {
        let dest = &team_tables[code];
        shards.sort_by_key(|(_, year)| *year);
        log::info!("Team {}: {} shard(s)", code, shards.len());
        for (shard, year) in shards.iter() {
            log::info!("merging {} -> {} (year={})", shard, dest, year);
            merge_shard_into_team(&mut tx, shard, dest, *year).await?;
            to_drop_after_commit.push(shard.clone());
        }
    }

    tx.commit().await.context("Committing roster merges")?;

    // Only now, past the commit point, discard the shards.
    for shard in &to_drop_after_commit {
        drop_shard(pool, shard).await?;
    }
    log::info!("Dropped {} shard table(s)", to_drop_after_commit.len());

    if !umpire_shards.is_empty() {
        log::info!(
            "{}: {} row(s)",
            UMPIRE_TABLE,
            count_rows(pool, UMPIRE_TABLE).await?
        );
    }
    for dest in team_tables.values() {
        log::info!("{}: {} row(s)", dest, count_rows(pool, dest).await?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_names_parse_team_and_year() {
        assert_eq!(
            parse_team_year("stg_retrosheet_rosters_rosters_wse1924_ros"),
            Some(("wse".into(), 1924))
        );
        assert_eq!(
            parse_team_year("stg_retrosheet_rosters_rosters_BOS1967_ros"),
            Some(("bos".into(), 1967))
        );
    }

    #[test]
    fn non_shard_names_are_rejected() {
        assert_eq!(parse_team_year("stg_lahman_people"), None);
        assert_eq!(
            parse_team_year("stg_retrosheet_rosters_rosters_wse24_ros"),
            None
        );
        assert_eq!(
            parse_team_year("stg_retrosheet_rosters_rosters_wse1924"),
            None
        );
        assert_eq!(
            parse_team_year("stg_retrosheet_rosters_rosters_w!e1924_ros"),
            None
        );
    }

    #[test]
    fn umpire_shards_are_routed_globally() {
        assert!(is_umpire_shard(
            "stg_retrosheet_rosters_rosters_ump1924_ros",
            "ump"
        ));
        assert!(is_umpire_shard("STG_UMPIRES_X_ABC1924_ROS", "abc"));
        assert!(!is_umpire_shard(
            "stg_retrosheet_rosters_rosters_wse1924_ros",
            "wse"
        ));
    }

    #[test]
    fn merge_sql_binds_role_and_year_as_values() {
        let sql = team_merge_sql("stg_rs_rosters_team_wse", "shard_t");
        assert!(sql.contains("INSERT IGNORE"));
        assert!(sql.contains("REGEXP '^[0-9]{4}-[0-9]{2}-[0-9]{2}$'"));
        assert!(sql.contains("STR_TO_DATE(c7, '%Y%m%d')"));
        // role and year are placeholders, not interpolated literals
        assert_eq!(sql.matches('?').count(), 2);
        assert!(!sql.contains("PLAYER"));
    }
}
