//! Per-iteration combat counters and cross-iteration statistics.
//!
//! Two lifetimes coexist here. Per-iteration totals (damage, healing, threat,
//! damage taken) are zeroed by the reset contract and folded into a
//! [`Distribution`] when the iteration ends. Per-action counters accumulate
//! across the whole run and are divided by the iteration count at report
//! time, which is what the casts-style golden tests consume.

use serde::{Deserialize, Serialize};

use super::spell::ActionId;

/// Hit/crit/miss/damage counters for one (spell, target) pair, accumulated
/// over every iteration of a run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TargetMetrics {
    pub casts: u64,
    pub hits: u64,
    pub crits: u64,
    pub misses: u64,
    pub damage: f64,
    pub threat: f64,
}

/// Running first/second-moment accumulator for a per-iteration statistic.
#[derive(Debug, Clone, Copy, Default)]
pub struct Distribution {
    n: u64,
    sum: f64,
    sum_sq: f64,
    max: f64,
}

impl Distribution {
    pub fn add(&mut self, value: f64) {
        self.n += 1;
        self.sum += value;
        self.sum_sq += value * value;
        if value > self.max {
            self.max = value;
        }
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn avg(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.sum / self.n as f64
        }
    }

    pub fn stdev(&self) -> f64 {
        if self.n == 0 {
            return 0.0;
        }
        let avg = self.avg();
        (self.sum_sq / self.n as f64 - avg * avg).max(0.0).sqrt()
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Totals gathered during one iteration. Every field must be zeroed by
/// `begin_iteration`; a field missed here is exactly the reset-leakage bug
/// class the split test catches.
#[derive(Debug, Clone, Copy, Default)]
pub struct IterationTotals {
    pub damage_dealt: f64,
    pub healing_dealt: f64,
    pub threat: f64,
    pub damage_taken: f64,
}

/// Mana gained/spent attributed to one action, accumulated across the run.
#[derive(Debug, Clone, Default)]
pub struct ResourceMetrics {
    pub action: ActionId,
    pub gained: f64,
    pub spent: f64,
}

/// Handle to a unit's per-action resource metrics entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceMetricsId(pub(crate) usize);

/// One unit's full metrics state for a run.
#[derive(Debug, Default)]
pub struct UnitMetrics {
    pub iteration: IterationTotals,
    pub dps: Distribution,
    pub hps: Distribution,
    pub tps: Distribution,
    pub dtps: Distribution,
    pub resources: Vec<ResourceMetrics>,
}

impl UnitMetrics {
    pub fn begin_iteration(&mut self) {
        self.iteration = IterationTotals::default();
    }

    /// Fold the finished iteration into the per-second distributions.
    pub fn end_iteration(&mut self, encounter_secs: f64) {
        let t = &self.iteration;
        self.dps.add(t.damage_dealt / encounter_secs);
        self.hps.add(t.healing_dealt / encounter_secs);
        self.tps.add(t.threat / encounter_secs);
        self.dtps.add(t.damage_taken / encounter_secs);
    }

    pub fn new_resource_metrics(&mut self, action: ActionId) -> ResourceMetricsId {
        self.resources.push(ResourceMetrics {
            action,
            ..Default::default()
        });
        ResourceMetricsId(self.resources.len() - 1)
    }
}

/// Converged averages for one unit, extracted once all iterations ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitMetricsSummary {
    pub dps: f64,
    pub dps_stdev: f64,
    pub hps: f64,
    pub tps: f64,
    pub dtps: f64,
    /// Per-action averages keyed by action name, casts per iteration plus
    /// lifetime counters.
    pub actions: Vec<ActionMetricsSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionMetricsSummary {
    pub action: String,
    pub casts_per_iteration: f64,
    pub casts: u64,
    pub hits: u64,
    pub crits: u64,
    pub misses: u64,
    pub damage: f64,
}
