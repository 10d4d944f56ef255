//! Behavioral contracts of the combat engine: snapshot rules, aura
//! idempotence, cast gates, rollover math, and exact damage accounting.
//!
//! Scenarios are driven by scripted rotations: the rotation callback is the
//! only code that runs inside an iteration, so a step counter plus returned
//! wakeup times gives full control over the in-iteration timeline.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use raidsim::core::{
    ActionId, AuraConfig, AuraDuration, CastConfig, Cooldown, DotConfig, OutcomeRule, SimOptions,
    SimTime, Simulation, SpellConfig, SpellFlags, StatBlock, UnitConfig, UnitId, GCD_DEFAULT,
};

fn scripted_sim(duration_secs: i64) -> (Simulation, UnitId, UnitId) {
    let mut sim = Simulation::new(SimOptions {
        seed: 1,
        iterations: 1,
        duration: SimTime::from_secs(duration_secs),
        log_enabled: false,
    });
    let enemy = sim.add_enemy(UnitConfig {
        name: "Target Dummy".into(),
        ..Default::default()
    });
    let player = sim.add_player(UnitConfig {
        name: "Caster".into(),
        base_mana: 1000.0,
        ..Default::default()
    });
    (sim, player, enemy)
}

fn burn_spell(tick_secs: i64, num_ticks: u32) -> SpellConfig {
    SpellConfig {
        action_id: ActionId::new(3),
        name: "Burn".into(),
        flags: SpellFlags::IGNORE_MODIFIERS,
        dot: Some(DotConfig::new(
            AuraConfig::new("Burn"),
            num_ticks,
            SimTime::from_secs(tick_secs),
        )),
        ..Default::default()
    }
}

#[test]
fn test_dot_ticks_reproduce_snapshot_after_buff_fades() {
    use raidsim::core::{SpellModConfig, SpellModKind};

    let (mut sim, player, enemy) = scripted_sim(10);
    let dot = sim.register_spell(
        player,
        SpellConfig {
            action_id: ActionId::new(3),
            name: "Burn".into(),
            dot: Some(DotConfig::new(
                AuraConfig::new("Burn"),
                2,
                SimTime::from_secs(2),
            )),
            ..Default::default()
        },
    );
    let buff = sim.add_dynamic_mod(player, SpellModConfig::new(SpellModKind::DamageDonePct, 0.5));

    let step = Rc::new(Cell::new(0));
    sim.set_rotation(
        player,
        Rc::new(move |sim, _unit| {
            if step.get() == 0 {
                step.set(1);
                // Snapshot while the buff is up, then drop it before any
                // tick lands.
                sim.activate_mod(buff);
                sim.dot_snapshot(dot, enemy, 100.0);
                sim.dot_apply(dot, enemy);
                sim.deactivate_mod(buff);
            }
            Some(sim.duration())
        }),
    );
    sim.run();

    // Both ticks carry the snapshotted 1.5x even though the buff is gone.
    let m = &sim.spell(dot).metrics[enemy.0];
    assert_eq!(m.hits, 2);
    assert_eq!(m.damage, 300.0);
}

#[test]
fn test_aura_refresh_extends_without_regain() {
    let (mut sim, player, _enemy) = scripted_sim(20);
    let gains = Rc::new(Cell::new(0u32));
    let aura = sim.register_aura(player, {
        let gains = gains.clone();
        let mut config = AuraConfig::new("Haste Surge");
        config.duration = AuraDuration::For(SimTime::from_secs(10));
        config.on_gain = Some(Rc::new(move |_sim, _id| gains.set(gains.get() + 1)));
        config
    });

    let observed = Rc::new(RefCell::new(Vec::new()));
    let step = Rc::new(Cell::new(0));
    sim.set_rotation(
        player,
        Rc::new({
            let observed = observed.clone();
            move |sim, _unit| match step.replace(step.get() + 1) {
                0 => {
                    sim.activate_aura(aura);
                    Some(SimTime::from_secs(5))
                }
                1 => {
                    // Refresh: expiry moves from 10s to 15s.
                    sim.activate_aura(aura);
                    Some(SimTime::from_secs(12))
                }
                2 => {
                    observed.borrow_mut().push(sim.aura_is_active(aura));
                    Some(SimTime::from_secs(16))
                }
                _ => {
                    observed.borrow_mut().push(sim.aura_is_active(aura));
                    Some(sim.duration())
                }
            }
        }),
    );
    sim.run();

    assert_eq!(*observed.borrow(), vec![true, false]);
    assert_eq!(gains.get(), 1);
}

#[test]
fn test_stacks_ignore_inactive_aura_and_clamp_at_max() {
    let (mut sim, player, _enemy) = scripted_sim(5);
    let changes = Rc::new(RefCell::new(Vec::new()));
    let aura = sim.register_aura(player, {
        let changes = changes.clone();
        let mut config = AuraConfig::new("Combo");
        config.max_stacks = 3;
        config.on_stacks_change = Some(Rc::new(move |_sim, _id, old, new| {
            changes.borrow_mut().push((old, new));
        }));
        config
    });

    let done = Rc::new(Cell::new(false));
    sim.set_rotation(
        player,
        Rc::new(move |sim, _unit| {
            if !done.replace(true) {
                sim.set_aura_stacks(aura, 2);
                assert_eq!(sim.aura_stacks(aura), 0, "inactive aura gained stacks");
                sim.activate_aura(aura);
                sim.set_aura_stacks(aura, 2);
                sim.set_aura_stacks(aura, 5);
                assert_eq!(sim.aura_stacks(aura), 3);
                sim.deactivate_aura(aura);
                assert_eq!(sim.aura_stacks(aura), 0);
            }
            Some(sim.duration())
        }),
    );
    sim.run();

    assert_eq!(*changes.borrow(), vec![(0, 2), (2, 3), (3, 0)]);
}

#[test]
fn test_failed_cast_gates_consume_nothing() {
    let (mut sim, player, enemy) = scripted_sim(5);
    let nuke = sim.register_spell(
        player,
        SpellConfig {
            action_id: ActionId::new(1),
            name: "Nuke".into(),
            mana_cost: 0.5,
            cast: CastConfig {
                gcd: GCD_DEFAULT,
                ..Default::default()
            },
            apply_effects: Some(Rc::new(|sim, target, spell| {
                sim.calc_and_deal_damage(spell, target, 100.0, OutcomeRule::AlwaysHit);
            })),
            ..Default::default()
        },
    );

    let done = Rc::new(Cell::new(false));
    sim.set_rotation(
        player,
        Rc::new(move |sim, unit| {
            if !done.replace(true) {
                assert!(sim.cast(nuke, enemy));
                let mana_after_first = sim.unit(unit).mana();
                assert_eq!(mana_after_first, 500.0);
                // Blocked by the GCD: no cost, no cast counted.
                assert!(!sim.cast(nuke, enemy));
                assert_eq!(sim.unit(unit).mana(), mana_after_first);
            }
            Some(sim.duration())
        }),
    );
    sim.run();

    assert_eq!(sim.spell(nuke).metrics[enemy.0].casts, 1);
}

#[test]
fn test_fixed_rotation_damage_is_exact() {
    let mut sim = Simulation::new(SimOptions {
        seed: 3,
        iterations: 2,
        duration: SimTime::from_secs(6),
        log_enabled: false,
    });
    let enemy = sim.add_enemy(UnitConfig {
        name: "Target Dummy".into(),
        ..Default::default()
    });
    let player = sim.add_player(UnitConfig {
        name: "Caster".into(),
        ..Default::default()
    });
    let nuke = sim.register_spell(
        player,
        SpellConfig {
            action_id: ActionId::new(1),
            name: "Nuke".into(),
            cast: CastConfig {
                gcd: GCD_DEFAULT,
                ..Default::default()
            },
            apply_effects: Some(Rc::new(|sim, target, spell| {
                sim.calc_and_deal_damage(spell, target, 1000.0, OutcomeRule::AlwaysHit);
            })),
            ..Default::default()
        },
    );
    sim.set_rotation(
        player,
        Rc::new(move |sim, _unit| {
            sim.cast(nuke, sim.primary_target());
            None
        }),
    );
    sim.run();

    // Casts at 0, 1.5, 3, 4.5 and 6 seconds: 5 per iteration, all hits.
    let m = &sim.spell(nuke).metrics[enemy.0];
    assert_eq!(m.casts, 10);
    assert_eq!(m.hits, 10);
    assert_eq!(m.crits, 0);
    assert_eq!(m.damage, 10_000.0);

    let summary = sim.unit_summary(player);
    assert_eq!(summary.dps, 5000.0 / 6.0);
    assert_eq!(summary.dps_stdev, 0.0);
}

#[test]
fn test_guaranteed_miss_deals_nothing() {
    let mut sim = Simulation::new(SimOptions {
        seed: 1,
        iterations: 1,
        duration: SimTime::from_secs(6),
        log_enabled: false,
    });
    let enemy = sim.add_enemy(UnitConfig {
        name: "Evasive".into(),
        spell_miss_chance: 1.0,
        ..Default::default()
    });
    let player = sim.add_player(UnitConfig {
        name: "Caster".into(),
        ..Default::default()
    });
    let nuke = sim.register_spell(
        player,
        SpellConfig {
            action_id: ActionId::new(1),
            name: "Nuke".into(),
            cast: CastConfig {
                gcd: GCD_DEFAULT,
                ..Default::default()
            },
            apply_effects: Some(Rc::new(|sim, target, spell| {
                sim.calc_and_deal_damage(spell, target, 1000.0, OutcomeRule::MagicHitAndCrit);
            })),
            ..Default::default()
        },
    );
    sim.set_rotation(
        player,
        Rc::new(move |sim, _unit| {
            sim.cast(nuke, sim.primary_target());
            None
        }),
    );
    sim.run();

    let m = &sim.spell(nuke).metrics[enemy.0];
    assert_eq!(m.misses, m.casts);
    assert_eq!(m.hits + m.crits, 0);
    assert_eq!(m.damage, 0.0);
    assert_eq!(sim.unit_summary(player).dps, 0.0);
}

#[test]
fn test_guaranteed_crit_applies_crit_multiplier() {
    let (mut sim, player, enemy) = scripted_sim(1);
    sim.unit_mut(player).stats_mut().spell_crit = 1.0;
    let nuke = sim.register_spell(
        player,
        SpellConfig {
            action_id: ActionId::new(1),
            name: "Nuke".into(),
            ..Default::default()
        },
    );

    let done = Rc::new(Cell::new(false));
    sim.set_rotation(
        player,
        Rc::new(move |sim, _unit| {
            if !done.replace(true) {
                let result = sim.calc_damage(nuke, enemy, 1000.0, OutcomeRule::MagicHitAndCrit);
                assert!(result.did_crit());
                assert_eq!(result.damage, 2000.0);
                sim.deal_damage(nuke, result);
            }
            Some(sim.duration())
        }),
    );
    sim.run();
    assert_eq!(sim.spell(nuke).metrics[enemy.0].crits, 1);
}

#[test]
fn test_rollover_refresh_blends_outstanding_damage() {
    let (mut sim, player, enemy) = scripted_sim(10);
    let burn = sim.register_spell(player, burn_spell(2, 2));

    let snapshots = Rc::new(RefCell::new(Vec::new()));
    let step = Rc::new(Cell::new(0));
    sim.set_rotation(
        player,
        Rc::new({
            let snapshots = snapshots.clone();
            move |sim, _unit| match step.replace(step.get() + 1) {
                0 => {
                    sim.dot_refresh_with_damage(burn, enemy, 1000.0);
                    snapshots
                        .borrow_mut()
                        .push(sim.dot_snapshot_base_damage(burn, enemy));
                    Some(SimTime::from_secs(3))
                }
                1 => {
                    // One of two 500-damage ticks has landed; 500 is still
                    // outstanding and blends with the new 1000.
                    assert_eq!(sim.dot_remaining_ticks(burn, enemy), 1);
                    sim.dot_refresh_with_damage(burn, enemy, 1000.0);
                    snapshots
                        .borrow_mut()
                        .push(sim.dot_snapshot_base_damage(burn, enemy));
                    Some(sim.duration())
                }
                _ => Some(sim.duration()),
            }
        }),
    );
    sim.run();

    assert_eq!(*snapshots.borrow(), vec![500.0, 750.0]);
    // Delivered: one 500 tick, then two 750 ticks from the refresh.
    let m = &sim.spell(burn).metrics[enemy.0];
    assert_eq!(m.hits, 3);
    assert_eq!(m.damage, 2000.0);
}

#[test]
fn test_tick_once_on_apply_adds_an_extra_tick() {
    let (mut sim, player, enemy) = scripted_sim(5);
    let mut config = burn_spell(1, 2);
    if let Some(dot) = &mut config.dot {
        dot.tick_once_on_apply = true;
    }
    let channel = sim.register_spell(player, config);

    let step = Rc::new(Cell::new(0));
    sim.set_rotation(
        player,
        Rc::new(move |sim, _unit| match step.replace(step.get() + 1) {
            0 => {
                sim.dot_snapshot(channel, enemy, 100.0);
                sim.dot_apply(channel, enemy);
                Some(SimTime::from_secs(3))
            }
            1 => {
                assert!(!sim.dot_is_active(channel, enemy));
                Some(sim.duration())
            }
            _ => Some(sim.duration()),
        }),
    );
    sim.run();

    // Immediate tick plus the two scheduled ones.
    let m = &sim.spell(channel).metrics[enemy.0];
    assert_eq!(m.hits, 3);
    assert_eq!(m.damage, 300.0);
}

#[test]
fn test_gcd_haste_is_floored() {
    let mut sim = Simulation::new(SimOptions {
        seed: 1,
        iterations: 1,
        duration: SimTime::from_secs(5),
        log_enabled: false,
    });
    let enemy = sim.add_enemy(UnitConfig {
        name: "Target Dummy".into(),
        ..Default::default()
    });
    let player = sim.add_player(UnitConfig {
        name: "Speedster".into(),
        stats: StatBlock {
            cast_speed: 2.0,
            ..Default::default()
        },
        ..Default::default()
    });
    let nuke = sim.register_spell(
        player,
        SpellConfig {
            action_id: ActionId::new(1),
            name: "Nuke".into(),
            cast: CastConfig {
                gcd: GCD_DEFAULT,
                ..Default::default()
            },
            ..Default::default()
        },
    );
    sim.set_rotation(
        player,
        Rc::new(move |sim, _unit| {
            sim.cast(nuke, sim.primary_target());
            None
        }),
    );
    sim.run();

    // 1500ms / 2.0 would be 750ms, but the floor holds it at 1000ms:
    // casts at 0..=5s inclusive.
    assert_eq!(sim.spell(nuke).metrics[enemy.0].casts, 6);
}

#[test]
fn test_travel_time_defers_delivery_but_not_metrics() {
    let (mut sim, player, enemy) = scripted_sim(10);
    let bolt = sim.register_spell(
        player,
        SpellConfig {
            action_id: ActionId::new(4),
            name: "Slow Bolt".into(),
            // 30 yards at 15 yd/s: lands 2s after resolution.
            missile_speed: 15.0,
            ..Default::default()
        },
    );
    sim.unit_mut(player).set_distance(30.0);

    let step = Rc::new(Cell::new(0));
    sim.set_rotation(
        player,
        Rc::new(move |sim, _unit| match step.replace(step.get() + 1) {
            0 => {
                let result = sim.calc_damage(bolt, enemy, 1000.0, OutcomeRule::AlwaysHit);
                // Counters move at resolution time...
                assert_eq!(sim.spell(bolt).metrics[enemy.0].hits, 1);
                sim.wait_travel_time(bolt, move |sim| sim.deal_damage(bolt, result));
                Some(SimTime::from_secs(1))
            }
            1 => {
                // ...but the missile is still in flight.
                assert_eq!(sim.unit(enemy).health(), 1_000_000.0);
                Some(SimTime::from_secs(3))
            }
            2 => {
                assert_eq!(sim.unit(enemy).health(), 999_000.0);
                Some(sim.duration())
            }
            _ => Some(sim.duration()),
        }),
    );
    sim.run();
}

#[test]
fn test_channel_snapshots_crit_at_cast_start() {
    use raidsim::core::SpellOutcome;

    let (mut sim, player, enemy) = scripted_sim(10);
    sim.unit_mut(player).stats_mut().spell_crit = 1.0;

    let outcome = Rc::new(Cell::new(SpellOutcome::Miss));
    let mut config = SpellConfig {
        action_id: ActionId::new(5),
        name: "Arcane Torrent".into(),
        flags: SpellFlags::CHANNELED,
        ..Default::default()
    };
    config.dot = Some({
        let outcome = outcome.clone();
        let mut dot = DotConfig::new(AuraConfig::new("Arcane Torrent"), 3, SimTime::from_millis(700));
        dot.on_tick = Some(Rc::new(move |sim, target, spell| {
            // The channel resolved its outcome once at cast start; every
            // tick replays it.
            let result = sim.finish_damage_calc(spell, target, 100.0, outcome.get());
            sim.deal_damage(spell, result);
        }));
        dot
    });
    let torrent = sim.register_spell(player, config);

    let done = Rc::new(Cell::new(false));
    sim.set_rotation(
        player,
        Rc::new(move |sim, unit| {
            if !done.replace(true) {
                outcome.set(sim.resolve_outcome(torrent, enemy, OutcomeRule::MagicHitAndCrit));
                sim.dot_apply(torrent, enemy);
                // Crit chance dropping mid-channel must not matter.
                sim.unit_mut(unit).stats_mut().spell_crit = 0.0;
            }
            Some(sim.duration())
        }),
    );
    sim.run();

    let m = &sim.spell(torrent).metrics[enemy.0];
    assert_eq!(m.crits, 3);
    assert_eq!(m.damage, 600.0);
}

#[test]
fn test_cooldown_gates_until_reset() {
    let (mut sim, player, enemy) = scripted_sim(5);
    let timer = sim.new_timer(player);
    let blast = sim.register_spell(
        player,
        SpellConfig {
            action_id: ActionId::new(2),
            name: "Blast".into(),
            cast: CastConfig {
                cooldown: Some(Cooldown {
                    timer,
                    duration: SimTime::from_secs(8),
                }),
                ..Default::default()
            },
            ..Default::default()
        },
    );

    let step = Rc::new(Cell::new(0));
    sim.set_rotation(
        player,
        Rc::new(move |sim, _unit| match step.replace(step.get() + 1) {
            0 => {
                assert!(sim.cast(blast, enemy));
                Some(SimTime::from_secs(1))
            }
            1 => {
                assert!(!sim.cast(blast, enemy), "cooldown did not gate the cast");
                sim.reset_timer(blast.caster(), timer);
                assert!(sim.cast(blast, enemy));
                Some(sim.duration())
            }
            _ => Some(sim.duration()),
        }),
    );
    sim.run();

    assert_eq!(sim.spell(blast).metrics[enemy.0].casts, 2);
}
