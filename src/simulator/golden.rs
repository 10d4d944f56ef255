//! Golden-result regression suite.
//!
//! Expected results live in `<suite>.results` as JSON. A run writes what it
//! actually measured to `<suite>.results.tmp` and compares against the
//! expected file within a fixed tolerance; updating expectations is renaming
//! the tmp file over the old one. A missing expected file compares against
//! an empty set, so every recorded test reports as unexpected.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::UnitMetricsSummary;

/// Precise enough to catch very small behavior changes, truncated enough
/// that platform float formatting differences cannot flake the suite.
pub const STORAGE_PRECISION: i32 = 5;

pub const TOLERANCE: f64 = 0.00001;

/// Round half away from zero at a decimal precision.
pub fn to_fixed(num: f64, precision: i32) -> f64 {
    let scale = 10f64.powi(precision);
    let scaled = num * scale;
    (scaled + 0.5_f64.copysign(scaled)).trunc() / scale
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DpsResult {
    pub dps: f64,
    pub hps: f64,
    pub tps: f64,
    pub dtps: f64,
}

/// All recorded measurements, keyed by test name. BTreeMaps keep the file
/// deterministic so diffs stay readable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoldenResults {
    pub dps: BTreeMap<String, DpsResult>,
    pub casts: BTreeMap<String, BTreeMap<String, f64>>,
}

pub struct GoldenSuite {
    name: String,
    dir: PathBuf,
    expected: GoldenResults,
    actual: GoldenResults,
}

impl GoldenSuite {
    /// Open a suite, loading expected results if the file exists.
    pub fn new(dir: impl AsRef<Path>, name: impl Into<String>) -> io::Result<Self> {
        let name = name.into();
        let dir = dir.as_ref().to_path_buf();
        let expected_path = dir.join(format!("{name}.results"));
        let expected = match fs::read_to_string(&expected_path) {
            Ok(data) => serde_json::from_str(&data)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => GoldenResults::default(),
            Err(e) => return Err(e),
        };
        Ok(Self {
            name,
            dir,
            expected,
            actual: GoldenResults::default(),
        })
    }

    /// Record a player's converged throughput numbers under a test name.
    pub fn record_dps(&mut self, test_name: &str, metrics: &UnitMetricsSummary) {
        self.actual.dps.insert(
            test_name.to_string(),
            DpsResult {
                dps: to_fixed(metrics.dps, STORAGE_PRECISION),
                hps: to_fixed(metrics.hps, STORAGE_PRECISION),
                tps: to_fixed(metrics.tps, STORAGE_PRECISION),
                dtps: to_fixed(metrics.dtps, STORAGE_PRECISION),
            },
        );
    }

    /// Record average casts per iteration by action, rounded to a tenth.
    pub fn record_casts(&mut self, test_name: &str, metrics: &UnitMetricsSummary) {
        let casts: BTreeMap<String, f64> = metrics
            .actions
            .iter()
            .map(|a| {
                (
                    a.action.clone(),
                    (a.casts_per_iteration * 10.0).round() / 10.0,
                )
            })
            .collect();
        self.actual.casts.insert(test_name.to_string(), casts);
    }

    /// Compare recorded measurements against expectations. Returns one
    /// message per mismatch; empty means the suite passed.
    pub fn compare(&self) -> Vec<String> {
        let mut failures = Vec::new();

        for (name, actual) in &self.actual.dps {
            match self.expected.dps.get(name) {
                None => failures.push(format!("unexpected test {name} with {:.3} dps", actual.dps)),
                Some(expected) => {
                    for (metric, a, e) in [
                        ("dps", actual.dps, expected.dps),
                        ("hps", actual.hps, expected.hps),
                        ("tps", actual.tps, expected.tps),
                        ("dtps", actual.dtps, expected.dtps),
                    ] {
                        if (a - e).abs() > TOLERANCE {
                            failures.push(format!(
                                "{name}: {metric} expected {e:.5} but was {a:.5}"
                            ));
                        }
                    }
                }
            }
        }

        for (name, actual) in &self.actual.casts {
            match self.expected.casts.get(name) {
                None => failures.push(format!("unexpected casts test {name}")),
                Some(expected) => {
                    for (action, a) in actual {
                        let e = expected.get(action).copied().unwrap_or(0.0);
                        if (a - e).abs() > TOLERANCE {
                            failures.push(format!(
                                "{name}: expected {e:.1} casts of {action} but was {a:.1}"
                            ));
                        }
                    }
                }
            }
        }
        failures
    }

    /// Write what this run measured next to the expected file.
    pub fn write_actual(&self) -> io::Result<()> {
        let path = self.dir.join(format!("{}.results.tmp", self.name));
        let data = serde_json::to_string_pretty(&self.actual)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, data)
    }

    pub fn actual(&self) -> &GoldenResults {
        &self.actual
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_fixed_rounds_half_away_from_zero() {
        assert_eq!(to_fixed(1.0000051, 5), 1.00001);
        assert_eq!(to_fixed(-1.0000051, 5), -1.00001);
        assert_eq!(to_fixed(1234.56789, 2), 1234.57);
    }

    #[test]
    fn test_to_fixed_is_idempotent() {
        let v = to_fixed(987.654321, STORAGE_PRECISION);
        assert_eq!(to_fixed(v, STORAGE_PRECISION), v);
    }

    #[test]
    fn test_compare_flags_drift_beyond_tolerance() {
        let mut suite = GoldenSuite {
            name: "unit".to_string(),
            dir: PathBuf::new(),
            expected: GoldenResults::default(),
            actual: GoldenResults::default(),
        };
        suite.expected.dps.insert(
            "t1".to_string(),
            DpsResult {
                dps: 100.0,
                ..Default::default()
            },
        );
        suite.actual.dps.insert(
            "t1".to_string(),
            DpsResult {
                dps: 100.00002,
                ..Default::default()
            },
        );
        let failures = suite.compare();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("dps"));
    }

    #[test]
    fn test_compare_within_tolerance_passes() {
        let mut suite = GoldenSuite {
            name: "unit".to_string(),
            dir: PathBuf::new(),
            expected: GoldenResults::default(),
            actual: GoldenResults::default(),
        };
        let r = DpsResult {
            dps: 55.5,
            hps: 1.0,
            tps: 27.75,
            dtps: 0.0,
        };
        suite.expected.dps.insert("t1".to_string(), r);
        suite.actual.dps.insert("t1".to_string(), r);
        assert!(suite.compare().is_empty());
    }
}
