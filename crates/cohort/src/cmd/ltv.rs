//! Ltv command - recompute per-user lifetime value

use anyhow::Result;

use cohort_analytics::{LtvAggregator, LtvSummary};
use cohort_config::Config;
use cohort_store::Store;

/// Run the ltv command
pub async fn run(config: &Config) -> Result<()> {
    let store = Store::open_existing(&config.data.db_path).await?;
    execute(&store).await?;
    Ok(())
}

/// Recompute the LTV table, returning the run summary
pub async fn execute(store: &Store) -> Result<LtvSummary> {
    let summary = LtvAggregator::new(store).run().await?;
    Ok(summary)
}
