//! Run command - the full pipeline in sequence
//!
//! Equivalent to `process` then `ltv` then `rollup` over one store handle.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use cohort_config::Config;
use cohort_store::Store;

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// CSV export to ingest (defaults to the configured path)
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,
}

/// Run the full pipeline
pub async fn run(args: RunArgs, config: &Config) -> Result<()> {
    let store = Store::open_existing(&config.data.db_path).await?;

    let ingested = super::process::execute(&store, config, args.csv.as_deref()).await?;
    let ltv = super::ltv::execute(&store).await?;
    let rollups = super::rollup::execute(&store, config).await?;

    info!(
        events = ingested.events_inserted,
        purchases = ingested.purchases_inserted,
        ltv_users = ltv.users,
        rollup_days = rollups.days,
        "Pipeline run complete"
    );

    Ok(())
}
