use anyhow::Result;
use clap::Parser;
use env_logger::Env;

use impact_etl::cli::{Cli, Command};
use impact_etl::config::AppConfig;
use impact_etl::db::make_pool;
use impact_etl::util::envfile::load_dotenv_if_present;
use impact_etl::{ingest, reconcile, rosters, war};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let _ = load_dotenv_if_present();

    let cli = Cli::parse();
    let mut cfg = AppConfig::from_env();
    cli.apply(&mut cfg);
    if cli.command.needs_database()
        && let Err(e) = cfg.validate()
    {
        eprintln!("Configuration error: {}", e);
        std::process::exit(2);
    }

    if let Err(e) = run(&cli, &cfg).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: &Cli, cfg: &AppConfig) -> Result<()> {
    match &cli.command {
        Command::Inventory => ingest::run_inventory(cfg),
        Command::Load { .. } => {
            let pool = make_pool(&cfg.database).await?;
            ingest::run_load(&pool, cfg).await?;
            Ok(())
        }
        Command::IngestWar => {
            let pool = make_pool(&cfg.database).await?;
            war::run_war_ingest(&pool, cfg).await
        }
        Command::Reconcile { .. } => {
            let pool = make_pool(&cfg.database).await?;
            reconcile::run_reconcile(&pool, cfg).await?;
            Ok(())
        }
        Command::MergeRosters => {
            let pool = make_pool(&cfg.database).await?;
            rosters::run_merge(&pool, cfg).await
        }
    }
}
