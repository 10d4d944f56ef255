//! Shared fixtures: a fire-caster build that exercises most of the engine.
//!
//! The kit combines a cast-time nuke, a cooldown-gated instant, a
//! crit-driven rollover burn, a crit-triggered damage buff backed by a
//! dynamic modifier, and a crit mana refund. Between them they touch the
//! scheduler, auras, dots, mods, procs, cooldowns and resource metrics, so
//! the determinism and reset suites get realistic coverage from one setup.

// Not every test binary uses every fixture.
#![allow(dead_code)]

use std::rc::Rc;

use raidsim::core::{
    ActionId, AuraConfig, AuraDuration, CastConfig, Cooldown, DotConfig, OutcomeFilter,
    OutcomeRule, ProcCallback, ProcTriggerConfig, SchoolMask, SimTime, Simulation, SpellCategory,
    SpellConfig, SpellFlags, SpellId, SpellModConfig, SpellModKind, StatBlock, UnitConfig, UnitId,
    GCD_DEFAULT,
};
use raidsim::simulator::SimConfig;

pub const FIREBALL_CLASS_MASK: SpellCategory = SpellCategory::bit(0);

pub struct FireKit {
    pub player: UnitId,
    pub fireball: SpellId,
    pub fire_blast: SpellId,
    pub burn: SpellId,
}

/// Register the fire caster against a simulation whose encounter already
/// has its targets.
pub fn add_fire_caster(sim: &mut Simulation) -> FireKit {
    let player = sim.add_player(UnitConfig {
        name: "Pyromancer".into(),
        base_mana: 20_000.0,
        stats: StatBlock {
            spell_power: 2500.0,
            spell_crit: 0.25,
            cast_speed: 1.1,
            ..Default::default()
        },
        ..Default::default()
    });

    // Rollover burn: crits feed it, refreshes blend undelivered damage into
    // a fresh pair of ticks. Exempt from modifiers since its snapshot
    // already contains them.
    let burn = sim.register_spell(
        player,
        SpellConfig {
            action_id: ActionId::new(3),
            name: "Searing Burn".into(),
            school: SchoolMask::FIRE,
            flags: SpellFlags::IGNORE_MODIFIERS,
            dot: Some(DotConfig::new(
                AuraConfig::new("Searing Burn"),
                2,
                SimTime::from_secs(2),
            )),
            ..Default::default()
        },
    );

    let fireball = sim.register_spell(
        player,
        SpellConfig {
            action_id: ActionId::new(1),
            name: "Fireball".into(),
            school: SchoolMask::FIRE,
            class_mask: FIREBALL_CLASS_MASK,
            mana_cost: 0.09,
            cast: CastConfig {
                gcd: GCD_DEFAULT,
                cast_time: SimTime::from_millis(2500),
                ..Default::default()
            },
            bonus_coefficient: 1.0,
            apply_effects: Some(Rc::new(|sim, target, spell| {
                let base = sim.roll(900.0, 1100.0, "Fireball");
                sim.calc_and_deal_damage(spell, target, base, OutcomeRule::MagicHitAndCrit);
            })),
            ..Default::default()
        },
    );

    let blast_timer = sim.new_timer(player);
    let fire_blast = sim.register_spell(
        player,
        SpellConfig {
            action_id: ActionId::new(2),
            name: "Fire Blast".into(),
            school: SchoolMask::FIRE,
            mana_cost: 0.07,
            cast: CastConfig {
                gcd: GCD_DEFAULT,
                cooldown: Some(Cooldown {
                    timer: blast_timer,
                    duration: SimTime::from_secs(8),
                }),
                ..Default::default()
            },
            bonus_coefficient: 0.4,
            apply_effects: Some(Rc::new(|sim, target, spell| {
                let base = sim.roll(750.0, 950.0, "Fire Blast");
                sim.calc_and_deal_damage(spell, target, base, OutcomeRule::MagicHitAndCrit);
            })),
            ..Default::default()
        },
    );

    // Crits roll 40% of their damage into the burn.
    sim.make_proc_trigger_aura(
        player,
        ProcTriggerConfig {
            outcome: OutcomeFilter::Crit,
            ..ProcTriggerConfig::new(
                "Searing Flames",
                ProcCallback::SPELL_HIT_DEALT,
                Rc::new(move |sim, _spell, result| {
                    if let Some(result) = result {
                        sim.dot_refresh_with_damage(burn, result.target, result.damage * 0.4);
                    }
                }),
            )
        },
    );

    // Crit-triggered damage buff: a 6s aura toggling a dynamic +20% fire
    // damage modifier.
    let surge_mod = sim.add_dynamic_mod(
        player,
        SpellModConfig::new(SpellModKind::DamageDonePct, 0.2).with_school(SchoolMask::FIRE),
    );
    let surge_aura = sim.register_aura(player, {
        let mut config = AuraConfig::new("Burning Surge");
        config.duration = AuraDuration::For(SimTime::from_secs(6));
        config.on_gain = Some(Rc::new(move |sim, _id| sim.activate_mod(surge_mod)));
        config.on_expire = Some(Rc::new(move |sim, _id| sim.deactivate_mod(surge_mod)));
        config
    });
    sim.make_proc_trigger_aura(
        player,
        ProcTriggerConfig {
            outcome: OutcomeFilter::Crit,
            proc_chance: 0.5,
            ..ProcTriggerConfig::new(
                "Burning Surge Trigger",
                ProcCallback::SPELL_HIT_DEALT,
                Rc::new(move |sim, _spell, _result| sim.activate_aura(surge_aura)),
            )
        },
    );

    // Crit mana refund, attributed to its own resource entry.
    let refund_metrics = sim.new_resource_metrics(player, ActionId::with_tag(1, 1));
    sim.make_proc_trigger_aura(
        player,
        ProcTriggerConfig {
            outcome: OutcomeFilter::Crit,
            ..ProcTriggerConfig::new(
                "Elemental Focus",
                ProcCallback::SPELL_HIT_DEALT,
                Rc::new(move |sim, spell, _result| {
                    let refund = sim.spell(spell).last_cast_cost() * 0.25;
                    if refund > 0.0 {
                        sim.add_mana(spell.caster(), refund, refund_metrics);
                    }
                }),
            )
        },
    );

    FireKit {
        player,
        fireball,
        fire_blast,
        burn,
    }
}

/// Full setup for the Monte Carlo runner: the fire caster plus its rotation.
pub fn fire_setup(sim: &mut Simulation) {
    let kit = add_fire_caster(sim);
    let (fireball, fire_blast) = (kit.fireball, kit.fire_blast);
    sim.set_rotation(
        kit.player,
        Rc::new(move |sim, _unit| {
            let target = sim.primary_target();
            if sim.cast(fire_blast, target) {
                return None;
            }
            sim.cast(fireball, target);
            None
        }),
    );
}

pub fn short_config(iterations: u32, seed: u64) -> SimConfig {
    SimConfig {
        iterations,
        seed,
        duration_secs: 30.0,
        target_miss_chance: 0.04,
        ..Default::default()
    }
}
