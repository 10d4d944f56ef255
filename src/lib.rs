//! raidsim - Statistical Combat Simulator
//!
//! A deterministic discrete-event engine for simulating ability rotations
//! against an encounter, plus a Monte Carlo harness that aggregates many
//! seeded iterations into throughput reports and regression suites.

pub mod core;
pub mod simulator;
