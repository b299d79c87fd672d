//! Init command - create the schema and seed currency rates
//!
//! Idempotent: re-running refreshes the seeded rates and leaves every other
//! table untouched.

use anyhow::Result;
use tracing::info;

use cohort_config::Config;
use cohort_store::Store;

/// Run the init command
pub async fn run(config: &Config) -> Result<()> {
    let store = Store::open(&config.data.db_path).await?;
    let rates = store.rates().all().await?;

    info!(
        path = %store.path(),
        rates = rates.len(),
        "Store initialized"
    );

    Ok(())
}
