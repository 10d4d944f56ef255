//! Golden-results workflow: record, write, promote, compare.

mod common;

use std::fs;

use common::{fire_setup, short_config};
use raidsim::simulator::{run_simulation, GoldenSuite};

#[test]
fn test_missing_expected_file_reports_every_test_as_unexpected() {
    let dir = tempfile::tempdir().unwrap();
    let config = short_config(10, 21);
    let result = run_simulation(&config, &fire_setup);
    assert!(result.error.is_none(), "{:?}", result.error);

    let mut suite = GoldenSuite::new(dir.path(), "fire").unwrap();
    suite.record_dps("fire-default", &result.players[0].metrics);
    suite.record_casts("fire-default-casts", &result.players[0].metrics);

    let failures = suite.compare();
    assert_eq!(failures.len(), 2);
    assert!(failures.iter().any(|f| f.contains("fire-default")));
}

#[test]
fn test_promoted_results_compare_clean() {
    let dir = tempfile::tempdir().unwrap();
    let config = short_config(10, 21);
    let result = run_simulation(&config, &fire_setup);
    assert!(result.error.is_none(), "{:?}", result.error);

    // First run records and writes its measurements.
    let mut suite = GoldenSuite::new(dir.path(), "fire").unwrap();
    suite.record_dps("fire-default", &result.players[0].metrics);
    suite.record_casts("fire-default-casts", &result.players[0].metrics);
    suite.write_actual().unwrap();

    // Promote the tmp file to the expected file, the way a developer
    // accepts intentional changes.
    fs::rename(
        dir.path().join("fire.results.tmp"),
        dir.path().join("fire.results"),
    )
    .unwrap();

    // A fresh identical run must now compare clean.
    let result2 = run_simulation(&config, &fire_setup);
    let mut suite2 = GoldenSuite::new(dir.path(), "fire").unwrap();
    suite2.record_dps("fire-default", &result2.players[0].metrics);
    suite2.record_casts("fire-default-casts", &result2.players[0].metrics);
    let failures = suite2.compare();
    assert!(failures.is_empty(), "unexpected drift: {failures:?}");
}

#[test]
fn test_drifted_results_are_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let config = short_config(10, 21);
    let result = run_simulation(&config, &fire_setup);

    let mut suite = GoldenSuite::new(dir.path(), "fire").unwrap();
    suite.record_dps("fire-default", &result.players[0].metrics);
    suite.write_actual().unwrap();
    fs::rename(
        dir.path().join("fire.results.tmp"),
        dir.path().join("fire.results"),
    )
    .unwrap();

    // A different seed is a behavior change as far as the suite can tell.
    let drifted = run_simulation(&short_config(10, 22), &fire_setup);
    let mut suite2 = GoldenSuite::new(dir.path(), "fire").unwrap();
    suite2.record_dps("fire-default", &drifted.players[0].metrics);
    let failures = suite2.compare();
    assert!(!failures.is_empty());
    assert!(failures[0].contains("expected"));
}
