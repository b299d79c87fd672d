//! Cohort - Mobile attribution analytics pipeline
//!
//! # Usage
//!
//! ```bash
//! # One-time setup: create the schema and seed currency rates
//! cohort init
//!
//! # Ingest a raw export, then derive LTV and rollups
//! cohort run
//! cohort run --csv exports/march.csv
//!
//! # Individual stages
//! cohort process
//! cohort ltv
//! cohort rollup
//! ```

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cohort_config::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Cohort - Mobile attribution analytics pipeline
#[derive(Parser, Debug)]
#[command(name = "cohort")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database schema and seed currency rates
    Init,

    /// Ingest the raw CSV export into the canonical store
    Process(cmd::process::ProcessArgs),

    /// Recompute per-user LTV from stored purchases
    Ltv,

    /// Recompute the daily/country/device rollup tables
    Rollup,

    /// Full pipeline: process, then ltv, then rollup
    Run(cmd::run::RunArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let log_level = resolve_log_level(cli.log_level.as_deref(), &config);
    init_logging(&log_level)?;

    match cli.command {
        Command::Init => cmd::init::run(&config).await,
        Command::Process(args) => cmd::process::run(args, &config).await,
        Command::Ltv => cmd::ltv::run(&config).await,
        Command::Rollup => cmd::rollup::run(&config).await,
        Command::Run(args) => cmd::run::run(args, &config).await,
    }
}

/// Load configuration: explicit file must exist, otherwise defaults apply
fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::from_file(path)?),
        None => Ok(Config::default()),
    }
}

/// Resolve log level: CLI flag > config file > default "info"
fn resolve_log_level(cli_level: Option<&str>, config: &Config) -> String {
    match cli_level {
        Some(level) => level.to_string(),
        None => config.log.level.as_str().to_string(),
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
