//! Units: players and enemies, their stats, pools, and per-iteration reset.

use std::rc::Rc;

use super::aura::Aura;
use super::metrics::UnitMetrics;
use super::mods::SpellMod;
use super::sim::Simulation;
use super::spell::Spell;
use super::time::SimTime;
use super::timers::TimerBank;

/// Index into the simulation's unit table. Players and enemies share one
/// table; handles embed this so effects can cross the line freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId(pub usize);

/// Combat stats consulted at cast and resolution time.
#[derive(Debug, Clone, Copy)]
pub struct StatBlock {
    pub spell_power: f64,
    /// Base crit chance as a fraction.
    pub spell_crit: f64,
    /// Multiplier on casting speed; 1.0 is unhasted.
    pub cast_speed: f64,
    pub mastery_points: f64,
}

impl Default for StatBlock {
    fn default() -> Self {
        Self {
            spell_power: 0.0,
            spell_crit: 0.0,
            cast_speed: 1.0,
            mastery_points: 0.0,
        }
    }
}

/// A bounded resource (health, mana). Refilled on iteration reset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourcePool {
    pub current: f64,
    pub max: f64,
}

impl ResourcePool {
    pub fn full(max: f64) -> Self {
        Self { current: max, max }
    }

    pub fn spend(&mut self, amount: f64) {
        self.current = (self.current - amount).max(0.0);
    }

    pub fn gain(&mut self, amount: f64) {
        self.current = (self.current + amount).min(self.max);
    }

    pub fn refill(&mut self) {
        self.current = self.max;
    }
}

#[derive(Debug, Clone)]
pub struct UnitConfig {
    pub name: String,
    pub stats: StatBlock,
    pub max_health: f64,
    /// Doubles as the mana pool size and the basis for fractional costs.
    pub base_mana: f64,
    /// Chance for incoming spells to miss this unit, as a fraction.
    pub spell_miss_chance: f64,
    /// Yards to the primary target, for missile travel time.
    pub distance: f64,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            stats: StatBlock::default(),
            max_health: 1_000_000.0,
            base_mana: 0.0,
            spell_miss_chance: 0.0,
            distance: 0.0,
        }
    }
}

/// Rotation callback: invoked at iteration start and whenever the unit may
/// act again. Returning a time requests the next wakeup; `None` falls back
/// to the unit's own readiness.
pub type RotationFn = Rc<dyn Fn(&mut Simulation, UnitId) -> Option<SimTime>>;

pub struct Unit {
    pub(crate) name: String,
    pub(crate) stats: StatBlock,
    base_mana: f64,
    pub(crate) health: ResourcePool,
    pub(crate) mana: ResourcePool,
    pub(crate) spell_miss_chance: f64,
    pub(crate) distance: f64,
    pub(crate) auras: Vec<Aura>,
    pub(crate) spells: Vec<Spell>,
    pub(crate) mods: Vec<SpellMod>,
    pub(crate) timers: TimerBank,
    pub(crate) gcd_ready_at: SimTime,
    pub(crate) cast_complete_at: SimTime,
    pub(crate) metrics: UnitMetrics,
    pub(crate) rotation: Option<RotationFn>,
}

impl Unit {
    pub(crate) fn new(config: UnitConfig) -> Self {
        Self {
            name: config.name,
            stats: config.stats,
            base_mana: config.base_mana,
            health: ResourcePool::full(config.max_health),
            mana: ResourcePool::full(config.base_mana),
            spell_miss_chance: config.spell_miss_chance,
            distance: config.distance,
            auras: Vec::new(),
            spells: Vec::new(),
            mods: Vec::new(),
            timers: TimerBank::default(),
            gcd_ready_at: SimTime::ZERO,
            cast_complete_at: SimTime::ZERO,
            metrics: UnitMetrics::default(),
            rotation: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats(&self) -> &StatBlock {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut StatBlock {
        &mut self.stats
    }

    pub fn base_mana(&self) -> f64 {
        self.base_mana
    }

    pub fn mana(&self) -> f64 {
        self.mana.current
    }

    pub fn health(&self) -> f64 {
        self.health.current
    }

    pub fn metrics(&self) -> &UnitMetrics {
        &self.metrics
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn set_distance(&mut self, yards: f64) {
        self.distance = yards;
    }

    pub(crate) fn spend_mana_raw(&mut self, amount: f64) {
        self.mana.spend(amount);
    }

    pub(crate) fn add_mana_raw(&mut self, amount: f64) {
        self.mana.gain(amount);
    }

    pub(crate) fn take_damage(&mut self, amount: f64) {
        self.health.spend(amount);
    }

    pub(crate) fn heal(&mut self, amount: f64) {
        self.health.gain(amount);
    }

    /// Everything per-iteration goes back to its initial value here. Aura
    /// runtime state is cleared separately so on-reset hooks run against a
    /// fully reset unit.
    pub(crate) fn reset_for_iteration(&mut self) {
        self.health.refill();
        self.mana.refill();
        self.timers.reset_all();
        self.gcd_ready_at = SimTime::ZERO;
        self.cast_complete_at = SimTime::ZERO;
        self.metrics.begin_iteration();
        for m in &mut self.mods {
            m.active = !m.dynamic;
        }
        for spell in &mut self.spells {
            spell.last_cast_cost = 0.0;
            for dot in spell.dots.iter_mut().flatten() {
                dot.reset_for_iteration();
            }
        }
    }
}
