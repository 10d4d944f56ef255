//! Drives full simulation runs and the split-run reset check.
//!
//! A setup function owns the character build: it registers players, spells,
//! auras and rotations against a simulation whose encounter is already in
//! place. The runner owns everything around that: seeding, iteration counts,
//! and turning an engine panic into an error result instead of a crash.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::core::{SimOptions, SimTime, Simulation, UnitConfig, UnitMetricsSummary};

use super::config::SimConfig;

/// Builds the player side of the fight. Called once per simulation instance.
pub type SetupFn = dyn Fn(&mut Simulation);

#[derive(Debug, Clone)]
pub struct PlayerResult {
    pub name: String,
    pub metrics: UnitMetricsSummary,
}

/// Outcome of one full run. A panic anywhere in the engine or ability code
/// surfaces as `error`; results are empty in that case.
#[derive(Debug, Clone, Default)]
pub struct SimResult {
    pub players: Vec<PlayerResult>,
    pub logs: Vec<String>,
    pub error: Option<String>,
}

/// Run the full simulation and collect per-player summaries.
pub fn run_simulation(config: &SimConfig, setup: &SetupFn) -> SimResult {
    run_with_seed(config, config.seed, config.iterations, setup)
}

fn run_with_seed(config: &SimConfig, seed: u64, iterations: u32, setup: &SetupFn) -> SimResult {
    if let Err(e) = config.validate() {
        return SimResult {
            error: Some(e),
            ..Default::default()
        };
    }

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let mut sim = Simulation::new(SimOptions {
            seed,
            iterations,
            duration: SimTime::from_secs_f64(config.duration_secs),
            log_enabled: config.log_enabled,
        });
        for i in 0..config.num_targets {
            sim.add_enemy(UnitConfig {
                name: format!("Target {}", i + 1),
                spell_miss_chance: config.target_miss_chance,
                ..Default::default()
            });
        }
        setup(&mut sim);
        sim.run();

        let players: Vec<PlayerResult> = sim
            .players()
            .to_vec()
            .into_iter()
            .map(|id| PlayerResult {
                name: sim.unit(id).name().to_string(),
                metrics: sim.unit_summary(id),
            })
            .collect();
        let logs = sim.take_logs();
        SimResult {
            players,
            logs,
            error: None,
        }
    }));

    match outcome {
        Ok(result) => result,
        Err(payload) => SimResult {
            error: Some(panic_message(payload)),
            ..Default::default()
        },
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "simulation panicked".to_string()
    }
}

/// Base-vs-split comparison for the first player.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResetTestResult {
    pub base_dps: f64,
    pub base_hps: f64,
    pub base_tps: f64,
    pub base_dtps: f64,
    pub split_dps: f64,
    pub split_hps: f64,
    pub split_tps: f64,
    pub split_dtps: f64,
}

/// Run `total_iterations` once, then again split across `splits` runs whose
/// base seeds advance by the iterations consumed before them. With a clean
/// per-iteration reset both sides are identical; any leaked state shows up
/// as a difference.
pub fn run_reset_leakage(
    config: &SimConfig,
    setup: &SetupFn,
    total_iterations: u32,
    splits: u32,
) -> Result<ResetTestResult, String> {
    let mut results = ResetTestResult::default();

    let base = run_with_seed(config, config.seed, total_iterations, setup);
    if let Some(e) = base.error {
        return Err(e);
    }
    let m = &base.players[0].metrics;
    results.base_dps = m.dps;
    results.base_hps = m.hps;
    results.base_tps = m.tps;
    results.base_dtps = m.dtps;

    let mut next_seed = config.seed;
    for i in 0..splits {
        let mut iterations = total_iterations / splits;
        if i == 0 {
            iterations += total_iterations % splits;
        }
        let split = run_with_seed(config, next_seed, iterations, setup);
        next_seed += iterations as u64;
        if let Some(e) = split.error {
            return Err(e);
        }

        let weight = iterations as f64 / total_iterations as f64;
        let m = &split.players[0].metrics;
        results.split_dps += m.dps * weight;
        results.split_hps += m.hps * weight;
        results.split_tps += m.tps * weight;
        results.split_dtps += m.dtps * weight;
    }
    Ok(results)
}
