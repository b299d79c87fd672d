//! Rollup command - recompute the dimensional summary tables

use anyhow::Result;

use cohort_analytics::{RollupGenerator, RollupSummary};
use cohort_config::Config;
use cohort_store::Store;

/// Run the rollup command
pub async fn run(config: &Config) -> Result<()> {
    let store = Store::open_existing(&config.data.db_path).await?;
    execute(&store, config).await?;
    Ok(())
}

/// Recompute the three rollup tables, returning the run summary
pub async fn execute(store: &Store, config: &Config) -> Result<RollupSummary> {
    let summary = RollupGenerator::new(store, config.ingest.purchase_event.clone())
        .run()
        .await?;
    Ok(summary)
}
