//! Table repositories
//!
//! One repository per persisted collection. Read paths open their own
//! connection; write paths that must share a table-replacement or chunk
//! transaction take the caller's connection explicitly.

mod events;
mod ltv;
mod purchases;
mod rates;
mod stats;
mod users;

/// Read a numeric column whether the engine stored REAL or INTEGER
pub(crate) fn numeric(value: &turso::Value) -> Option<f64> {
    value
        .as_real()
        .copied()
        .or_else(|| value.as_integer().map(|i| *i as f64))
}

pub use events::EventRepo;
pub use ltv::LtvRepo;
pub use purchases::PurchaseRepo;
pub use rates::RateRepo;
pub use stats::StatsRepo;
pub use users::UserRepo;
