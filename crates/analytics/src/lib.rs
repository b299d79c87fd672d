//! Cohort Analytics
//!
//! Derived analytical products over the canonical store:
//!
//! - **LTV**: per-user revenue bucketed into 1/7/14/30/60/90-day windows
//!   anchored to the first purchase, plus a total (`LtvAggregator`)
//! - **Rollups**: daily, per-country and per-device activity and revenue
//!   summaries (`RollupGenerator`)
//!
//! Both are full-refresh computations: each run replaces its output tables
//! wholesale inside one transaction.
//!
//! # Usage
//!
//! ```ignore
//! use cohort_analytics::{LtvAggregator, RollupGenerator};
//!
//! let ltv = LtvAggregator::new(&store).run().await?;
//! let rollups = RollupGenerator::new(&store, "af_purchase").run().await?;
//! println!("{} users, {} days", ltv.users, rollups.days);
//! ```

pub mod error;
pub mod ltv;
pub mod rollup;


// Re-exports for convenience
pub use error::{AnalyticsError, Result};
pub use ltv::{compute_ltv, LtvAggregator, LtvSummary};
pub use rollup::{compute_rollups, RollupGenerator, RollupSummary};
