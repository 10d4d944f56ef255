//! Determinism guarantees of the harness.
//!
//! The same configuration must produce bit-identical results no matter when
//! or how often it runs, and observability switches must never perturb the
//! numbers.

mod common;

use common::{fire_setup, short_config};
use raidsim::simulator::run_simulation;

#[test]
fn test_same_seed_reproduces_results_exactly() {
    let config = short_config(25, 42);
    let a = run_simulation(&config, &fire_setup);
    let b = run_simulation(&config, &fire_setup);

    assert!(a.error.is_none(), "{:?}", a.error);
    let (ma, mb) = (&a.players[0].metrics, &b.players[0].metrics);
    assert_eq!(ma.dps, mb.dps);
    assert_eq!(ma.tps, mb.tps);
    assert_eq!(ma.dtps, mb.dtps);
    assert_eq!(ma.actions.len(), mb.actions.len());
    for (x, y) in ma.actions.iter().zip(&mb.actions) {
        assert_eq!(x.action, y.action);
        assert_eq!(x.casts, y.casts);
        assert_eq!(x.crits, y.crits);
        assert_eq!(x.damage, y.damage);
    }
}

#[test]
fn test_different_seeds_diverge() {
    let a = run_simulation(&short_config(25, 1), &fire_setup);
    let b = run_simulation(&short_config(25, 2), &fire_setup);
    assert_ne!(a.players[0].metrics.dps, b.players[0].metrics.dps);
}

#[test]
fn test_logging_does_not_change_results() {
    let quiet = short_config(10, 7);
    let mut loud = short_config(10, 7);
    loud.log_enabled = true;

    let a = run_simulation(&quiet, &fire_setup);
    let b = run_simulation(&loud, &fire_setup);
    assert_eq!(a.players[0].metrics.dps, b.players[0].metrics.dps);
    assert!(a.logs.is_empty());
    assert!(!b.logs.is_empty());
}

#[test]
fn test_single_iteration_matches_first_of_many() {
    // Iteration i reseeds with seed + i, so a 1-iteration run equals the
    // first iteration of a longer run with the same base seed.
    let one = run_simulation(&short_config(1, 11), &fire_setup);
    let many = run_simulation(&short_config(5, 11), &fire_setup);
    // casts accumulate across iterations; the first iteration's share can't
    // be recovered from totals, so compare against a split run instead.
    let rest = run_simulation(&short_config(4, 12), &fire_setup);

    let total = |r: &raidsim::simulator::SimResult| -> u64 {
        r.players[0].metrics.actions.iter().map(|a| a.casts).sum()
    };
    assert_eq!(total(&one) + total(&rest), total(&many));
}
