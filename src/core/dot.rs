//! Periodic effects: snapshot-at-apply ticking damage bound to a
//! (spell, target) pair.
//!
//! Base damage and the attacker's multiplier are captured when the effect is
//! applied or refreshed and never re-read at tick time. A tick-time dynamic
//! multiplier (a stacking mastery bonus, say) may still be folded in by the
//! tick callback — base snapshotted, multiplier live. That asymmetry is
//! deliberate domain behavior; do not "fix" it toward full snapshotting.

use std::rc::Rc;

use super::aura::{AuraConfig, AuraDuration, AuraId};
use super::scheduler::PendingActionId;
use super::sim::Simulation;
use super::spell::SpellId;
use super::time::{SimTime, PRIORITY_DOT};
use super::unit::UnitId;

pub type DotTickFn = Rc<dyn Fn(&mut Simulation, UnitId, SpellId)>;

/// What a re-application does to an instance that is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Undelivered damage is blended with the new amount over a fresh set
    /// of ticks: `(outstanding + new) / num_ticks`. The currently-active
    /// reference behavior.
    Blend,
    /// Historical variant: skip the refresh entirely while more than
    /// `max_remaining` is left, otherwise blend over `refresh_ticks`.
    ExtendCapped {
        refresh_ticks: u32,
        max_remaining: SimTime,
    },
}

#[derive(Clone)]
pub struct DotConfig {
    /// Bookkeeping aura registered on every potential target; carries the
    /// effect's label and any lifecycle hooks.
    pub aura: AuraConfig,
    pub num_ticks: u32,
    pub tick_length: SimTime,
    /// Fire one extra tick at the moment of application (channel-driven
    /// effects).
    pub tick_once_on_apply: bool,
    /// Snapshot the caster's cast speed into the tick interval at apply.
    pub haste_affects_interval: bool,
    pub refresh_policy: RefreshPolicy,
    /// Per-tick behavior. When absent, a tick deals
    /// `snapshot_base_damage * snapshot_attacker_multiplier`.
    pub on_tick: Option<DotTickFn>,
}

impl DotConfig {
    pub fn new(aura: AuraConfig, num_ticks: u32, tick_length: SimTime) -> Self {
        Self {
            aura,
            num_ticks,
            tick_length,
            tick_once_on_apply: false,
            haste_affects_interval: false,
            refresh_policy: RefreshPolicy::Blend,
            on_tick: None,
        }
    }
}

/// Runtime state of one periodic-effect instance.
pub struct Dot {
    pub(crate) aura: AuraId,
    pub(crate) num_ticks: u32,
    pub(crate) base_num_ticks: u32,
    pub(crate) tick_count: u32,
    pub(crate) period: SimTime,
    pub(crate) base_period: SimTime,
    pub(crate) snapshot_base_damage: f64,
    pub(crate) snapshot_attacker_multiplier: f64,
    pub(crate) tick_action: Option<PendingActionId>,
}

impl Dot {
    pub(crate) fn reset_for_iteration(&mut self) {
        self.num_ticks = self.base_num_ticks;
        self.tick_count = 0;
        self.period = self.base_period;
        self.snapshot_base_damage = 0.0;
        self.snapshot_attacker_multiplier = 1.0;
        self.tick_action = None;
    }
}

impl Simulation {
    /// Build per-target dot instances and their bookkeeping auras for a
    /// freshly registered spell.
    pub(crate) fn register_dot_instances(
        &mut self,
        spell: SpellId,
        config: &DotConfig,
    ) -> Vec<Option<Dot>> {
        assert!(
            config.num_ticks > 0 || config.tick_once_on_apply,
            "periodic effect '{}' has no ticks",
            config.aura.label
        );
        assert!(
            config.tick_length > SimTime::ZERO,
            "periodic effect '{}' has a zero tick length",
            config.aura.label
        );

        let unit_count = self.units.len();
        let mut dots = Vec::with_capacity(unit_count);
        for target_idx in 0..unit_count {
            let target = UnitId(target_idx);
            let mut aura_config = config.aura.clone();
            // Cancel any in-flight tick when the backing aura goes down,
            // whatever took it down.
            let inner_expire = aura_config.on_expire.take();
            aura_config.on_expire = Some(Rc::new(move |sim, aura_id| {
                sim.dot_cancel_pending_tick(spell, target);
                if let Some(hook) = &inner_expire {
                    hook(sim, aura_id);
                }
            }));
            let aura = self.register_aura(target, aura_config);
            dots.push(Some(Dot {
                aura,
                num_ticks: config.num_ticks,
                base_num_ticks: config.num_ticks,
                tick_count: 0,
                period: config.tick_length,
                base_period: config.tick_length,
                snapshot_base_damage: 0.0,
                snapshot_attacker_multiplier: 1.0,
                tick_action: None,
            }));
        }
        dots
    }

    fn dot_ref(&self, spell: SpellId, target: UnitId) -> &Dot {
        self.spell(spell).dots[target.0]
            .as_ref()
            .unwrap_or_else(|| panic!("spell '{}' has no periodic effect", self.spell(spell).name()))
    }

    fn dot_mut(&mut self, spell: SpellId, target: UnitId) -> &mut Dot {
        self.units[spell.unit.0].spells[spell.idx].dots[target.0]
            .as_mut()
            .expect("spell has no periodic effect")
    }

    pub fn dot_is_active(&self, spell: SpellId, target: UnitId) -> bool {
        let aura = self.dot_ref(spell, target).aura;
        self.aura_is_active(aura)
    }

    pub fn dot_snapshot_base_damage(&self, spell: SpellId, target: UnitId) -> f64 {
        self.dot_ref(spell, target).snapshot_base_damage
    }

    pub fn dot_snapshot_attacker_multiplier(&self, spell: SpellId, target: UnitId) -> f64 {
        self.dot_ref(spell, target).snapshot_attacker_multiplier
    }

    pub fn dot_remaining_ticks(&self, spell: SpellId, target: UnitId) -> u32 {
        let dot = self.dot_ref(spell, target);
        dot.num_ticks.saturating_sub(dot.tick_count)
    }

    /// Damage not yet delivered by the running instance; zero when inactive.
    pub fn dot_outstanding_damage(&self, spell: SpellId, target: UnitId) -> f64 {
        if !self.dot_is_active(spell, target) {
            return 0.0;
        }
        let dot = self.dot_ref(spell, target);
        dot.snapshot_base_damage * dot.num_ticks.saturating_sub(dot.tick_count) as f64
    }

    pub fn dot_remaining_duration(&self, spell: SpellId, target: UnitId) -> SimTime {
        if !self.dot_is_active(spell, target) {
            return SimTime::ZERO;
        }
        let aura = self.dot_ref(spell, target).aura;
        self.aura_remaining(aura)
    }

    /// Capture the damage-affecting state of this instant: base damage, the
    /// attacker's current multiplier, and the (optionally haste-scaled) tick
    /// interval. Ticks reproduce these values until the next snapshot.
    pub fn dot_snapshot(&mut self, spell: SpellId, target: UnitId, base_damage: f64) {
        let attacker_multiplier = self.spell_damage_multiplier(spell);
        let speed = self.unit(spell.unit).stats.cast_speed;
        let config = self.spell(spell).config.dot.as_ref().expect("spell has no periodic effect");
        let haste_scaled = config.haste_affects_interval;
        let base_period = config.tick_length;

        let dot = self.dot_mut(spell, target);
        dot.snapshot_base_damage = base_damage;
        dot.snapshot_attacker_multiplier = attacker_multiplier;
        dot.period = if haste_scaled {
            SimTime::from_secs_f64(base_period.as_secs_f64() / speed)
        } else {
            base_period
        };
    }

    /// Start (or restart) the instance from the current snapshot with a
    /// fresh tick count. Refreshing a running instance moves its expiry
    /// without re-firing the aura's on-gain.
    pub fn dot_apply(&mut self, spell: SpellId, target: UnitId) {
        let ticks = self
            .spell(spell)
            .config
            .dot
            .as_ref()
            .expect("spell has no periodic effect")
            .num_ticks;
        self.dot_start(spell, target, ticks);
    }

    fn dot_start(&mut self, spell: SpellId, target: UnitId, num_ticks: u32) {
        let now = self.current_time();
        let tick_once = self
            .spell(spell)
            .config
            .dot
            .as_ref()
            .map(|c| c.tick_once_on_apply)
            .unwrap_or(false);

        self.dot_cancel_pending_tick(spell, target);
        let (aura, period) = {
            let dot = self.dot_mut(spell, target);
            dot.num_ticks = num_ticks;
            dot.tick_count = 0;
            (dot.aura, dot.period)
        };

        let total = period * num_ticks;
        self.units[target.0].auras[aura.idx].config.duration = AuraDuration::For(total);
        self.activate_aura(aura);

        if num_ticks > 0 {
            let action = self.schedule_delayed(now + period, PRIORITY_DOT, move |sim| {
                sim.dot_tick(spell, target);
            });
            self.dot_mut(spell, target).tick_action = Some(action);
        }
        if tick_once {
            self.dot_tick_once(spell, target);
        }
    }

    /// Re-apply with fresh damage, folding undelivered damage from the
    /// replaced instance into the new snapshot per the refresh policy.
    pub fn dot_refresh_with_damage(&mut self, spell: SpellId, target: UnitId, new_damage: f64) {
        let (policy, fresh_ticks) = {
            let config = self
                .spell(spell)
                .config
                .dot
                .as_ref()
                .expect("spell has no periodic effect");
            (config.refresh_policy, config.num_ticks)
        };
        let outstanding = self.dot_outstanding_damage(spell, target);
        let active = self.dot_is_active(spell, target);

        let ticks = match policy {
            RefreshPolicy::Blend => fresh_ticks,
            RefreshPolicy::ExtendCapped {
                refresh_ticks,
                max_remaining,
            } => {
                if active && self.dot_remaining_duration(spell, target) > max_remaining {
                    return;
                }
                if active {
                    refresh_ticks
                } else {
                    fresh_ticks
                }
            }
        };

        self.dot_snapshot(spell, target, (outstanding + new_damage) / ticks as f64);
        self.dot_start(spell, target, ticks);
    }

    /// Fire one tick immediately without consuming the tick budget.
    pub fn dot_tick_once(&mut self, spell: SpellId, target: UnitId) {
        self.dot_fire_tick(spell, target);
    }

    fn dot_tick(&mut self, spell: SpellId, target: UnitId) {
        let (last, aura) = {
            let dot = self.dot_mut(spell, target);
            dot.tick_action = None;
            dot.tick_count += 1;
            (dot.tick_count >= dot.num_ticks, dot.aura)
        };

        self.dot_fire_tick(spell, target);

        if last {
            // Anything that must run strictly after the final tick schedules
            // itself at this timestamp with a later priority, typically from
            // the aura's on-expire.
            self.deactivate_aura(aura);
        } else {
            let now = self.current_time();
            let period = self.dot_ref(spell, target).period;
            let action = self.schedule_delayed(now + period, PRIORITY_DOT, move |sim| {
                sim.dot_tick(spell, target);
            });
            self.dot_mut(spell, target).tick_action = Some(action);
        }
    }

    fn dot_fire_tick(&mut self, spell: SpellId, target: UnitId) {
        let on_tick = self
            .spell(spell)
            .config
            .dot
            .as_ref()
            .and_then(|c| c.on_tick.clone());
        match on_tick {
            Some(hook) => hook(self, target, spell),
            None => {
                let dot = self.dot_ref(spell, target);
                let damage = dot.snapshot_base_damage * dot.snapshot_attacker_multiplier;
                let result = self.calc_periodic_damage(spell, target, damage);
                self.deal_periodic_damage(spell, result);
            }
        }
    }

    pub(crate) fn dot_cancel_pending_tick(&mut self, spell: SpellId, target: UnitId) {
        let pending = self.dot_mut(spell, target).tick_action.take();
        if let Some(action) = pending {
            self.queue.cancel(action);
        }
    }
}
