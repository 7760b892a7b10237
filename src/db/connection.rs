use crate::config::DatabaseConfig;
use anyhow::{Context, Result};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use std::time::Duration;

/// Build the single connection pool used for an entire run. The pipeline is
/// sequential, so a handful of connections is plenty; `IMPACT_ETL_POOL_SIZE`
/// overrides the default for unusual setups.
pub async fn make_pool(cfg: &DatabaseConfig) -> Result<MySqlPool> {
    let max_conn: u32 = match std::env::var("IMPACT_ETL_POOL_SIZE") {
        Ok(s) => match s.parse::<u32>() {
            Ok(v) if v > 0 => v,
            _ => {
                log::warn!("Invalid IMPACT_ETL_POOL_SIZE='{}'; using default", s);
                4
            }
        },
        Err(_) => 4,
    };
    let pool = MySqlPoolOptions::new()
        .max_connections(max_conn)
        .min_connections(1)
        .acquire_timeout(Duration::from_millis(30_000))
        .test_before_acquire(true)
        .connect(&cfg.to_url())
        .await
        .with_context(|| {
            format!(
                "Failed to connect to MySQL at {}:{}/{}",
                cfg.host, cfg.port, cfg.database
            )
        })?;
    Ok(pool)
}
