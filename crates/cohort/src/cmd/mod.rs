//! Command implementations for the Cohort CLI

pub mod init;
pub mod ltv;
pub mod process;
pub mod rollup;
pub mod run;
