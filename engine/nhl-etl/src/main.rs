use anyhow::Context;
use clap::{Parser, Subcommand};
use nhl_etl::{collect_all, dry_run, EtlConfig, LoadReport, Stage};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nhl-etl")]
#[command(about = "Load NHL teams, players and season stats into PostgreSQL")]
#[command(version = "0.1.0")]
struct Cli {
    /// TOML config file; NHL_ETL__* environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fetch and normalize, but load into memory instead of PostgreSQL
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the team table
    Teams,

    /// Replace the player table from every team roster
    Players,

    /// Replace the stats table for players already in the player table
    Stats,

    /// Run teams, players and stats in order
    All,
}

impl Commands {
    fn stages(&self) -> &'static [Stage] {
        match self {
            Commands::Teams => &[Stage::Teams],
            Commands::Players => &[Stage::Players],
            Commands::Stats => &[Stage::Stats],
            Commands::All => &Stage::ALL,
        }
    }
}

fn summarize(reports: &[LoadReport]) {
    for report in reports {
        info!(
            "{}: fetched {}, inserted {}",
            report.table, report.rows_fetched, report.rows_inserted
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = EtlConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let stages = cli.command.stages();

    info!("Starting NHL ETL ({} stage(s), dry run: {})", stages.len(), cli.dry_run);

    let result = if cli.dry_run {
        dry_run(&config, stages).await.map(|(reports, _)| reports)
    } else {
        collect_all(&config, stages).await
    };

    match result {
        Ok(reports) => {
            summarize(&reports);
            Ok(())
        }
        Err(e) => {
            error!("NHL ETL failed: {}", e);
            Err(e.into())
        }
    }
}
