//! Process command - ingest the raw CSV export

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;

use cohort_config::Config;
use cohort_ingest::{IngestSummary, Pipeline, RateTable};
use cohort_store::Store;

/// Process command arguments
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// CSV export to ingest (defaults to the configured path)
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,
}

/// Run the process command
pub async fn run(args: ProcessArgs, config: &Config) -> Result<()> {
    let store = Store::open_existing(&config.data.db_path).await?;
    execute(&store, config, args.csv.as_deref()).await?;
    Ok(())
}

/// Ingest an export into the store, returning the run summary
pub async fn execute(
    store: &Store,
    config: &Config,
    csv: Option<&Path>,
) -> Result<IngestSummary> {
    let rates = RateTable::new(store.rates().all().await?);
    let pipeline = Pipeline::new(store, rates, &config.ingest);

    let csv_path = csv.unwrap_or(&config.data.csv_path);
    let summary = pipeline.run(csv_path).await?;

    Ok(summary)
}
