//! Declarative proc triggers.
//!
//! A trigger is a permanent aura whose hooks filter broadcast events by
//! category mask, proc mask, and outcome, roll an optional proc chance, and
//! then run a handler. One named rng draw per candidate event keeps runs
//! reproducible under the fixed-seed contract.

use std::rc::Rc;

use super::aura::{make_permanent, AuraConfig, AuraId};
use super::category::{ProcMask, SpellCategory};
use super::sim::Simulation;
use super::spell::{SpellId, SpellResult};
use super::time::SimTime;
use super::timers::TimerId;
use super::unit::UnitId;

/// Which broadcast events the trigger listens to. A mask so one trigger can
/// watch both direct hits and periodic ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcCallback(u32);

impl ProcCallback {
    pub const NONE: ProcCallback = ProcCallback(0);
    pub const SPELL_HIT_DEALT: ProcCallback = ProcCallback(1 << 0);
    pub const PERIODIC_DAMAGE_DEALT: ProcCallback = ProcCallback(1 << 1);
    pub const CAST_COMPLETE: ProcCallback = ProcCallback(1 << 2);

    pub const fn matches(self, other: ProcCallback) -> bool {
        self.0 & other.0 != 0
    }
}

impl std::ops::BitOr for ProcCallback {
    type Output = ProcCallback;

    fn bitor(self, rhs: ProcCallback) -> ProcCallback {
        ProcCallback(self.0 | rhs.0)
    }
}

/// Outcome requirement for result-bearing events. Cast-complete events carry
/// no outcome and pass any filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutcomeFilter {
    #[default]
    Any,
    Landed,
    Crit,
}

/// `result` is None for cast-complete events.
pub type ProcHandler = Rc<dyn Fn(&mut Simulation, SpellId, Option<&SpellResult>)>;

pub struct ProcTriggerConfig {
    /// Doubles as the aura label and the rng draw label.
    pub name: String,
    pub callback: ProcCallback,
    /// Empty mask matches every category.
    pub class_mask: SpellCategory,
    /// Empty mask matches every proc mask.
    pub proc_mask: ProcMask,
    pub outcome: OutcomeFilter,
    /// 1.0 skips the rng draw entirely.
    pub proc_chance: f64,
    /// Zero disables the internal cooldown.
    pub icd: SimTime,
    pub handler: ProcHandler,
}

impl ProcTriggerConfig {
    pub fn new(name: impl Into<String>, callback: ProcCallback, handler: ProcHandler) -> Self {
        Self {
            name: name.into(),
            callback,
            class_mask: SpellCategory::NONE,
            proc_mask: ProcMask::NONE,
            outcome: OutcomeFilter::Any,
            proc_chance: 1.0,
            icd: SimTime::ZERO,
            handler,
        }
    }
}

struct TriggerRuntime {
    name: String,
    owner: UnitId,
    class_mask: SpellCategory,
    proc_mask: ProcMask,
    outcome: OutcomeFilter,
    proc_chance: f64,
    icd: SimTime,
    icd_timer: Option<TimerId>,
    handler: ProcHandler,
}

impl TriggerRuntime {
    fn try_proc(&self, sim: &mut Simulation, spell: SpellId, result: Option<&SpellResult>) {
        let s = &sim.spell(spell).config;
        if !self.proc_mask.is_empty() && !self.proc_mask.matches(s.proc_mask) {
            return;
        }
        if !self.class_mask.is_empty() && !self.class_mask.matches(s.class_mask) {
            return;
        }
        if let Some(r) = result {
            match self.outcome {
                OutcomeFilter::Any => {}
                OutcomeFilter::Landed => {
                    if !r.landed() {
                        return;
                    }
                }
                OutcomeFilter::Crit => {
                    if !r.did_crit() {
                        return;
                    }
                }
            }
        }
        if let Some(timer) = self.icd_timer {
            let now = sim.current_time();
            if !sim.unit(self.owner).timers.is_ready(timer, now) {
                return;
            }
        }
        if self.proc_chance < 1.0 && !sim.rng.proc(self.proc_chance, &self.name) {
            return;
        }
        if let Some(timer) = self.icd_timer {
            let at = sim.current_time() + self.icd;
            sim.units[self.owner.0].timers.set(timer, at);
        }
        (self.handler)(sim, spell, result);
    }
}

impl Simulation {
    /// Install a proc trigger on a unit as a self-re-arming permanent aura.
    pub fn make_proc_trigger_aura(&mut self, unit: UnitId, config: ProcTriggerConfig) -> AuraId {
        let icd_timer = if config.icd > SimTime::ZERO {
            Some(self.unit_mut(unit).timers.new_timer())
        } else {
            None
        };
        let runtime = Rc::new(TriggerRuntime {
            name: config.name.clone(),
            owner: unit,
            class_mask: config.class_mask,
            proc_mask: config.proc_mask,
            outcome: config.outcome,
            proc_chance: config.proc_chance,
            icd: config.icd,
            icd_timer,
            handler: config.handler,
        });

        let mut aura_config = make_permanent(AuraConfig::new(config.name));
        if config.callback.matches(ProcCallback::CAST_COMPLETE) {
            let rt = runtime.clone();
            aura_config.on_cast_complete =
                Some(Rc::new(move |sim, _aura, spell| rt.try_proc(sim, spell, None)));
        }
        if config.callback.matches(ProcCallback::SPELL_HIT_DEALT) {
            let rt = runtime.clone();
            aura_config.on_spell_hit_dealt = Some(Rc::new(move |sim, _aura, spell, result| {
                rt.try_proc(sim, spell, Some(result))
            }));
        }
        if config.callback.matches(ProcCallback::PERIODIC_DAMAGE_DEALT) {
            let rt = runtime;
            aura_config.on_periodic_damage_dealt = Some(Rc::new(move |sim, _aura, spell, result| {
                rt.try_proc(sim, spell, Some(result))
            }));
        }
        self.register_aura(unit, aura_config)
    }
}
