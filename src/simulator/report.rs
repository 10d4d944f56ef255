//! Simulation report generation.

use serde::{Deserialize, Serialize};

use crate::core::UnitMetricsSummary;

use super::config::SimConfig;
use super::runner::SimResult;

/// Aggregated results from one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimReport {
    pub iterations: u32,
    pub seed: u64,
    pub duration_secs: f64,
    pub num_targets: u32,
    pub players: Vec<PlayerReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerReport {
    pub name: String,
    pub metrics: UnitMetricsSummary,
}

impl SimReport {
    pub fn from_result(config: &SimConfig, result: &SimResult) -> Self {
        Self {
            iterations: config.iterations,
            seed: config.seed,
            duration_secs: config.duration_secs,
            num_targets: config.num_targets,
            players: result
                .players
                .iter()
                .map(|p| PlayerReport {
                    name: p.name.clone(),
                    metrics: p.metrics.clone(),
                })
                .collect(),
        }
    }

    /// Generate a text report.
    pub fn to_text(&self) -> String {
        let mut report = String::new();

        report.push_str("═══════════════════════════════════════════════════════════════\n");
        report.push_str("                    SIMULATION REPORT\n");
        report.push_str("═══════════════════════════════════════════════════════════════\n\n");

        report.push_str(&format!(
            "Iterations: {}  Seed: {}  Duration: {:.0}s  Targets: {}\n\n",
            self.iterations, self.seed, self.duration_secs, self.num_targets
        ));

        for player in &self.players {
            let m = &player.metrics;
            report.push_str(&format!(
                "── {} ──────────────────────────────────────────────────\n",
                player.name
            ));
            report.push_str(&format!(
                "  DPS:   {:>10.2}  (stdev {:.2})\n",
                m.dps, m.dps_stdev
            ));
            report.push_str(&format!("  HPS:   {:>10.2}\n", m.hps));
            report.push_str(&format!("  TPS:   {:>10.2}\n", m.tps));
            report.push_str(&format!("  DTPS:  {:>10.2}\n\n", m.dtps));

            report.push_str(&format!(
                "  {:<24} {:>10} {:>8} {:>8} {:>8} {:>14}\n",
                "Action", "Casts/Iter", "Hits", "Crits", "Misses", "Damage"
            ));
            for a in &m.actions {
                report.push_str(&format!(
                    "  {:<24} {:>10.1} {:>8} {:>8} {:>8} {:>14.0}\n",
                    a.action, a.casts_per_iteration, a.hits, a.crits, a.misses, a.damage
                ));
            }
            report.push('\n');
        }
        report
    }

    /// Serialize the report as pretty JSON.
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("failed to serialize report: {e}"))
    }
}
