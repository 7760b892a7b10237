use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;

#[derive(Debug, Parser)]
#[command(
    name = "impact_etl",
    version,
    about = "Stage baseball statistics files into MySQL and reconcile player identities",
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
    /// Data root to scan (env: DATA_ROOT)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_root: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stage every recognized data file into a typed staging table
    Load {
        /// Rows per multi-row INSERT batch
        #[arg(long, default_value_t = 2_000)]
        batch_size: usize,
        /// Rows sampled per file when inferring column types
        #[arg(long, default_value_t = 1_500)]
        sample_rows: usize,
    },
    /// Truncate and reload the structured Baseball-Reference WAR tables
    IngestWar,
    /// Build the player-id crosswalk and write matches back
    Reconcile {
        /// Override file of (foreign id, canonical id) pairs (env: PLAYER_ID_OVERRIDES)
        #[arg(long, value_name = "FILE")]
        overrides: Option<PathBuf>,
    },
    /// Merge per-team-per-year roster shards and drop them
    MergeRosters,
    /// List the files a load would stage, without touching the database
    Inventory,
}

impl Command {
    pub fn needs_database(&self) -> bool {
        !matches!(self, Command::Inventory)
    }
}

impl Cli {
    /// Overlay command-line settings onto the environment-built config.
    pub fn apply(&self, cfg: &mut AppConfig) {
        if let Some(root) = &self.data_root {
            cfg.loader.data_root = root.clone();
        }
        match &self.command {
            Command::Load {
                batch_size,
                sample_rows,
            } => {
                cfg.loader.batch_size = *batch_size;
                cfg.loader.sample_rows = *sample_rows;
            }
            Command::Reconcile { overrides } => {
                if let Some(path) = overrides {
                    cfg.reconcile.overrides_path = Some(path.clone());
                }
            }
            _ => {}
        }
    }
}
