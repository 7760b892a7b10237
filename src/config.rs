use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl DatabaseConfig {
    pub fn to_url(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct LoaderConfig {
    pub data_root: PathBuf,
    pub batch_size: usize,
    pub sample_rows: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("./data"),
            batch_size: 2_000,
            sample_rows: 1_500,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct ReconcileConfig {
    pub overrides_path: Option<PathBuf>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

/// First set variable wins; aliases are listed most-specific first.
fn env_any(keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| std::env::var(k).ok())
}

impl AppConfig {
    /// Build the process-wide configuration from the environment, once, at
    /// startup. Call after `util::envfile::load_dotenv_if_present` so a
    /// `.env` file can supply any of these without overriding the real
    /// environment.
    pub fn from_env() -> Self {
        let port = env_any(&["MYSQL_PORT", "DB_PORT"])
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(3306);
        Self {
            database: DatabaseConfig {
                username: env_any(&["MYSQL_USER", "DB_USER"]).unwrap_or_default(),
                password: env_any(&["MYSQL_PASS", "DB_PASSWORD", "DB_PASS"]).unwrap_or_default(),
                host: env_any(&["MYSQL_HOST", "DB_HOST"]).unwrap_or_else(|| "localhost".into()),
                port,
                database: env_any(&["MYSQL_DB", "DB_NAME"]).unwrap_or_else(|| "mlb_impact".into()),
            },
            loader: LoaderConfig {
                data_root: env_any(&["DATA_ROOT"])
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./data")),
                ..LoaderConfig::default()
            },
            reconcile: ReconcileConfig {
                overrides_path: env_any(&["PLAYER_ID_OVERRIDES"]).map(PathBuf::from),
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.host.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "database.host",
            });
        }
        if self.database.username.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "database.username",
            });
        }
        if self.database.database.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "database.database",
            });
        }
        if self.database.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.port",
                reason: "must be non-zero".into(),
            });
        }
        if self.loader.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "loader.batch_size",
                reason: "must be > 0".into(),
            });
        }
        if self.loader.sample_rows == 0 {
            return Err(ConfigError::InvalidValue {
                field: "loader.sample_rows",
                reason: "must be > 0".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_includes_all_parts() {
        let cfg = DatabaseConfig {
            username: "u".into(),
            password: "p".into(),
            host: "h".into(),
            port: 3307,
            database: "d".into(),
        };
        assert_eq!(cfg.to_url(), "mysql://u:p@h:3307/d");
    }

    #[test]
    fn debug_redacts_password() {
        let cfg = DatabaseConfig {
            password: "hunter2".into(),
            ..DatabaseConfig::default()
        };
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn validate_rejects_zero_batch() {
        let mut cfg = AppConfig {
            database: DatabaseConfig {
                username: "u".into(),
                host: "h".into(),
                port: 3306,
                database: "d".into(),
                ..DatabaseConfig::default()
            },
            ..AppConfig::default()
        };
        cfg.loader.batch_size = 0;
        assert!(cfg.validate().is_err());
    }
}
