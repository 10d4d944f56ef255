//! Monte Carlo harness on top of the combat engine.
//!
//! Runs many seeded iterations of a fight and aggregates per-player
//! throughput and per-action counters into reports. Also hosts the
//! regression machinery: the base-vs-split reset check and the
//! golden-results suite.

mod config;
mod golden;
mod report;
mod runner;

pub use config::SimConfig;
pub use golden::{to_fixed, DpsResult, GoldenResults, GoldenSuite, STORAGE_PRECISION, TOLERANCE};
pub use report::{PlayerReport, SimReport};
pub use runner::{
    run_reset_leakage, run_simulation, PlayerResult, ResetTestResult, SetupFn, SimResult,
};
