//! Aura lifecycle and hook dispatch.
//!
//! Auras are registered once at setup and live for the whole simulation;
//! only their runtime state (active flag, stacks, expiry) changes between
//! iterations. The on-reset hook is how a listener re-arms itself each
//! iteration — any per-iteration mutable field an aura owns must be
//! reinitialized there.
//!
//! Dispatch broadcasts to every active registered listener on the unit in
//! registration order. Listeners self-filter with mask tests; the dispatcher
//! never pre-filters.

use std::rc::Rc;

use super::scheduler::PendingActionId;
use super::sim::Simulation;
use super::spell::{ActionId, SpellId, SpellResult};
use super::time::{SimTime, PRIORITY_AURA_EXPIRE};
use super::unit::UnitId;

/// How long an aura stays active once gained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuraDuration {
    /// Stays active until explicitly deactivated (and through iteration
    /// resets only if on-reset re-activates it).
    #[default]
    Never,
    For(SimTime),
}

/// Handle to a registered aura.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AuraId {
    pub(crate) unit: UnitId,
    pub(crate) idx: usize,
}

impl AuraId {
    pub fn unit(self) -> UnitId {
        self.unit
    }
}

pub type AuraHook = Rc<dyn Fn(&mut Simulation, AuraId)>;
pub type AuraStacksHook = Rc<dyn Fn(&mut Simulation, AuraId, u32, u32)>;
pub type AuraCastHook = Rc<dyn Fn(&mut Simulation, AuraId, SpellId)>;
pub type AuraResultHook = Rc<dyn Fn(&mut Simulation, AuraId, SpellId, &SpellResult)>;

#[derive(Default, Clone)]
pub struct AuraConfig {
    /// Identity. At most one aura per label per unit.
    pub label: String,
    /// Optional action identity for metrics/logs.
    pub action_id: Option<ActionId>,
    pub duration: AuraDuration,
    /// 0 means the aura does not stack.
    pub max_stacks: u32,
    pub on_reset: Option<AuraHook>,
    pub on_gain: Option<AuraHook>,
    pub on_expire: Option<AuraHook>,
    pub on_stacks_change: Option<AuraStacksHook>,
    pub on_cast_complete: Option<AuraCastHook>,
    pub on_spell_hit_dealt: Option<AuraResultHook>,
    pub on_periodic_damage_dealt: Option<AuraResultHook>,
}

impl AuraConfig {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }
}

pub struct Aura {
    pub(crate) config: AuraConfig,
    pub(crate) active: bool,
    pub(crate) stacks: u32,
    pub(crate) expires_at: Option<SimTime>,
    pub(crate) expiry_action: Option<PendingActionId>,
}

impl Aura {
    pub(crate) fn new(config: AuraConfig) -> Self {
        Self {
            config,
            active: false,
            stacks: 0,
            expires_at: None,
            expiry_action: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn stacks(&self) -> u32 {
        self.stacks
    }

    /// Clear all per-iteration runtime state. Hooks are not fired here; the
    /// simulation dispatches on-reset afterwards so listeners re-arm against
    /// a fully cleared unit.
    pub(crate) fn clear_runtime_state(&mut self) {
        self.active = false;
        self.stacks = 0;
        self.expires_at = None;
        self.expiry_action = None;
    }
}

impl Simulation {
    /// Register an aura on a unit. Duplicate labels are a configuration
    /// error: idempotent activation relies on one live instance per label.
    pub fn register_aura(&mut self, unit: UnitId, config: AuraConfig) -> AuraId {
        assert!(
            !config.label.is_empty(),
            "aura registered without a label on unit {}",
            self.unit(unit).name
        );
        let u = self.unit_mut(unit);
        assert!(
            !u.auras.iter().any(|a| a.config.label == config.label),
            "duplicate aura label '{}' on unit {}",
            config.label,
            u.name
        );
        u.auras.push(Aura::new(config));
        AuraId {
            unit,
            idx: u.auras.len() - 1,
        }
    }

    pub fn aura(&self, id: AuraId) -> &Aura {
        &self.unit(id.unit).auras[id.idx]
    }

    fn aura_mut(&mut self, id: AuraId) -> &mut Aura {
        &mut self.units[id.unit.0].auras[id.idx]
    }

    /// Look an aura up by label.
    pub fn find_aura(&self, unit: UnitId, label: &str) -> Option<AuraId> {
        self.unit(unit)
            .auras
            .iter()
            .position(|a| a.config.label == label)
            .map(|idx| AuraId { unit, idx })
    }

    /// Activate, or refresh if already active. Refreshing a finite-duration
    /// aura moves its expiry to now + duration without re-running on-gain.
    pub fn activate_aura(&mut self, id: AuraId) {
        let now = self.current_time();
        let aura = self.aura_mut(id);
        let duration = aura.config.duration;

        if aura.active {
            let pending = aura.expiry_action.take();
            if let AuraDuration::For(d) = duration {
                if let Some(action) = pending {
                    self.queue.cancel(action);
                }
                self.schedule_aura_expiry(id, now + d);
            }
            return;
        }

        let aura = self.aura_mut(id);
        aura.active = true;
        let on_gain = aura.config.on_gain.clone();
        if self.log_enabled() {
            let label = self.aura(id).config.label.clone();
            self.log(format!("aura gained: {label}"));
        }
        if let AuraDuration::For(d) = duration {
            self.schedule_aura_expiry(id, now + d);
        }
        if let Some(hook) = on_gain {
            hook(self, id);
        }
    }

    fn schedule_aura_expiry(&mut self, id: AuraId, at: SimTime) {
        let now = self.current_time();
        let action = self
            .queue
            .schedule(now, at, PRIORITY_AURA_EXPIRE, Box::new(move |sim| {
                sim.deactivate_aura(id);
            }));
        let aura = self.aura_mut(id);
        aura.expires_at = Some(at);
        aura.expiry_action = Some(action);
    }

    /// Deactivate: clears stacks, cancels the pending self-expiry, fires
    /// on-expire. No-op when already inactive.
    pub fn deactivate_aura(&mut self, id: AuraId) {
        let aura = self.aura_mut(id);
        if !aura.active {
            return;
        }
        aura.active = false;
        let old_stacks = aura.stacks;
        aura.stacks = 0;
        aura.expires_at = None;
        let pending = aura.expiry_action.take();
        let on_expire = aura.config.on_expire.clone();
        let on_stacks = aura.config.on_stacks_change.clone();

        if let Some(action) = pending {
            self.queue.cancel(action);
        }
        if self.log_enabled() {
            let label = self.aura(id).config.label.clone();
            self.log(format!("aura faded: {label}"));
        }
        if old_stacks > 0 {
            if let Some(hook) = on_stacks {
                hook(self, id, old_stacks, 0);
            }
        }
        if let Some(hook) = on_expire {
            hook(self, id);
        }
    }

    pub fn aura_is_active(&self, id: AuraId) -> bool {
        self.aura(id).active
    }

    pub fn aura_stacks(&self, id: AuraId) -> u32 {
        self.aura(id).stacks
    }

    /// Remaining time before self-expiry; permanent auras report the time
    /// left in the encounter.
    pub fn aura_remaining(&self, id: AuraId) -> SimTime {
        match self.aura(id).expires_at {
            Some(at) => at - self.current_time(),
            None => self.duration() - self.current_time(),
        }
    }

    pub fn add_aura_stack(&mut self, id: AuraId) {
        let stacks = self.aura(id).stacks;
        self.set_aura_stacks(id, stacks + 1);
    }

    /// Set the stack count, clamped to [0, max_stacks]. Stacks never
    /// implicitly activate or deactivate the aura; callers own those edges
    /// explicitly.
    pub fn set_aura_stacks(&mut self, id: AuraId, stacks: u32) {
        let aura = self.aura_mut(id);
        assert!(
            aura.config.max_stacks > 0,
            "set_aura_stacks on non-stacking aura '{}'",
            aura.config.label
        );
        if !aura.active && stacks > 0 {
            // Matching the reference behavior: stacking an inactive aura is
            // ignored rather than silently activating it.
            return;
        }
        let new = stacks.min(aura.config.max_stacks);
        let old = aura.stacks;
        if new == old {
            return;
        }
        aura.stacks = new;
        let hook = aura.config.on_stacks_change.clone();
        if self.log_enabled() {
            let label = self.aura(id).config.label.clone();
            self.log(format!("aura {label} stacks: {old} -> {new}"));
        }
        if let Some(hook) = hook {
            hook(self, id, old, new);
        }
    }

    /// Iteration reset for one unit's auras: clear all runtime state, then
    /// fire every registered on-reset hook in registration order.
    pub(crate) fn reset_auras(&mut self, unit: UnitId) {
        for aura in &mut self.units[unit.0].auras {
            aura.clear_runtime_state();
        }
        let hooks: Vec<(AuraId, AuraHook)> = self.units[unit.0]
            .auras
            .iter()
            .enumerate()
            .filter_map(|(idx, a)| {
                a.config
                    .on_reset
                    .clone()
                    .map(|h| (AuraId { unit, idx }, h))
            })
            .collect();
        for (id, hook) in hooks {
            hook(self, id);
        }
    }

    /// Broadcast a completed cast to the caster's active listeners.
    pub(crate) fn dispatch_cast_complete(&mut self, caster: UnitId, spell: SpellId) {
        let hooks: Vec<(AuraId, AuraCastHook)> = self.units[caster.0]
            .auras
            .iter()
            .enumerate()
            .filter(|(_, a)| a.active)
            .filter_map(|(idx, a)| {
                a.config
                    .on_cast_complete
                    .clone()
                    .map(|h| (AuraId { unit: caster, idx }, h))
            })
            .collect();
        for (id, hook) in hooks {
            hook(self, id, spell);
        }
    }

    /// Broadcast a delivered spell hit to the attacker's active listeners.
    pub(crate) fn dispatch_spell_hit_dealt(
        &mut self,
        attacker: UnitId,
        spell: SpellId,
        result: &SpellResult,
    ) {
        let hooks: Vec<(AuraId, AuraResultHook)> = self.units[attacker.0]
            .auras
            .iter()
            .enumerate()
            .filter(|(_, a)| a.active)
            .filter_map(|(idx, a)| {
                a.config
                    .on_spell_hit_dealt
                    .clone()
                    .map(|h| (AuraId { unit: attacker, idx }, h))
            })
            .collect();
        for (id, hook) in hooks {
            hook(self, id, spell, result);
        }
    }

    /// Broadcast a delivered periodic tick to the attacker's active
    /// listeners.
    pub(crate) fn dispatch_periodic_damage_dealt(
        &mut self,
        attacker: UnitId,
        spell: SpellId,
        result: &SpellResult,
    ) {
        let hooks: Vec<(AuraId, AuraResultHook)> = self.units[attacker.0]
            .auras
            .iter()
            .enumerate()
            .filter(|(_, a)| a.active)
            .filter_map(|(idx, a)| {
                a.config
                    .on_periodic_damage_dealt
                    .clone()
                    .map(|h| (AuraId { unit: attacker, idx }, h))
            })
            .collect();
        for (id, hook) in hooks {
            hook(self, id, spell, result);
        }
    }
}

/// Build a permanent aura that re-activates itself on every iteration reset.
/// The usual shape for passive listeners.
pub fn make_permanent(mut config: AuraConfig) -> AuraConfig {
    config.duration = AuraDuration::Never;
    config.on_reset = Some(Rc::new(|sim, id| sim.activate_aura(id)));
    config
}
