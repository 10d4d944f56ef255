//! Spell registration, the cast state machine, and outcome resolution.
//!
//! A cast walks Idle -> Casting (if cast time > 0) -> outcome resolution ->
//! effect application -> Idle. Failed gates (extra condition, cooldown, GCD,
//! resource) are silent no-ops that consume nothing.
//!
//! Metrics are finalized at outcome resolution. Travel-delayed spells defer
//! only the damage *event* (health change, hit hooks) to the landing time;
//! the counters already moved when the outcome was rolled. Tests depend on
//! that ordering.

use std::fmt;
use std::rc::Rc;

use super::category::{ProcMask, SchoolMask, SpellCategory};
use super::dot::{Dot, DotConfig};
use super::metrics::{ResourceMetricsId, TargetMetrics};
use super::sim::Simulation;
use super::time::{SimTime, PRIORITY_DEFAULT};
use super::timers::Cooldown;
use super::unit::UnitId;

/// Standard global cooldown.
pub const GCD_DEFAULT: SimTime = SimTime::from_millis(1500);
/// Floor for haste-shortened GCDs.
pub const GCD_MIN: SimTime = SimTime::from_millis(1000);

/// Action identity used by metrics and logs. `tag` distinguishes sub-actions
/// sharing a spell id (a channel and its per-tick bolt, say).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ActionId {
    pub spell_id: u32,
    pub tag: u32,
}

impl ActionId {
    pub const fn new(spell_id: u32) -> Self {
        Self { spell_id, tag: 0 }
    }

    pub const fn with_tag(spell_id: u32, tag: u32) -> Self {
        Self { spell_id, tag }
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tag == 0 {
            write!(f, "Spell({})", self.spell_id)
        } else {
            write!(f, "Spell({}, tag={})", self.spell_id, self.tag)
        }
    }
}

/// Behavioral flags. A mask rather than bools so ability definitions can
/// OR them together in one field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpellFlags(u32);

impl SpellFlags {
    pub const NONE: SpellFlags = SpellFlags(0);
    /// Channeled: effects arrive over the channel's ticks.
    pub const CHANNELED: SpellFlags = SpellFlags(1 << 0);
    /// Exempt from SpellMod aggregation (proc-owned damage like rolled-over
    /// periodic effects, which already snapshotted their modifiers).
    pub const IGNORE_MODIFIERS: SpellFlags = SpellFlags(1 << 1);

    pub const fn matches(self, other: SpellFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub(crate) const fn ignores_modifiers(self) -> bool {
        self.matches(Self::IGNORE_MODIFIERS)
    }
}

impl std::ops::BitOr for SpellFlags {
    type Output = SpellFlags;

    fn bitor(self, rhs: SpellFlags) -> SpellFlags {
        SpellFlags(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CastConfig {
    /// Zero means the cast is off the global cooldown.
    pub gcd: SimTime,
    /// Zero-length casts complete instantly, in the same scheduler tick.
    pub cast_time: SimTime,
    pub cooldown: Option<Cooldown>,
}

pub type ExtraCastCondition = Rc<dyn Fn(&Simulation, UnitId) -> bool>;
pub type ApplyEffects = Rc<dyn Fn(&mut Simulation, UnitId, SpellId)>;

#[derive(Clone)]
pub struct SpellConfig {
    pub action_id: ActionId,
    /// Human-readable name used as the metrics/report key.
    pub name: String,
    pub school: SchoolMask,
    pub proc_mask: ProcMask,
    pub class_mask: SpellCategory,
    pub flags: SpellFlags,
    /// Cost as a fraction of the unit's base mana.
    pub mana_cost: f64,
    pub cast: CastConfig,
    pub damage_multiplier: f64,
    pub threat_multiplier: f64,
    pub crit_multiplier: f64,
    /// Scales the caster's spell power into the base damage.
    pub bonus_coefficient: f64,
    /// Yards per second; zero delivers instantly.
    pub missile_speed: f64,
    pub extra_cast_condition: Option<ExtraCastCondition>,
    /// Invoked once the cast completes and the outcome can be resolved.
    pub apply_effects: Option<ApplyEffects>,
    pub dot: Option<DotConfig>,
}

impl Default for SpellConfig {
    fn default() -> Self {
        Self {
            action_id: ActionId::default(),
            name: String::new(),
            school: SchoolMask::NONE,
            proc_mask: ProcMask::NONE,
            class_mask: SpellCategory::NONE,
            flags: SpellFlags::NONE,
            mana_cost: 0.0,
            cast: CastConfig::default(),
            damage_multiplier: 1.0,
            threat_multiplier: 1.0,
            crit_multiplier: 2.0,
            bonus_coefficient: 0.0,
            missile_speed: 0.0,
            extra_cast_condition: None,
            apply_effects: None,
            dot: None,
        }
    }
}

/// Handle to a registered spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpellId {
    pub(crate) unit: UnitId,
    pub(crate) idx: usize,
}

impl SpellId {
    pub fn caster(self) -> UnitId {
        self.unit
    }
}

pub struct Spell {
    pub config: SpellConfig,
    /// Per-target counters, indexed by unit index, accumulated across
    /// iterations.
    pub metrics: Vec<TargetMetrics>,
    /// Periodic-effect instance per target, present when the config has one.
    pub(crate) dots: Vec<Option<Dot>>,
    /// Cost actually paid by the most recent cast (after modifiers).
    pub(crate) last_cast_cost: f64,
}

impl Spell {
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn last_cast_cost(&self) -> f64 {
        self.last_cast_cost
    }
}

/// Result of resolving one cast against one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpellOutcome {
    Hit,
    Crit,
    Miss,
}

impl SpellOutcome {
    pub fn landed(self) -> bool {
        !matches!(self, SpellOutcome::Miss)
    }

    pub fn did_crit(self) -> bool {
        matches!(self, SpellOutcome::Crit)
    }
}

/// A resolved outcome awaiting delivery. Delivery consumes the value, so a
/// single resolution can never be dealt twice.
#[derive(Debug, Clone)]
pub struct SpellResult {
    pub target: UnitId,
    pub outcome: SpellOutcome,
    pub damage: f64,
    pub threat: f64,
}

impl SpellResult {
    pub fn landed(&self) -> bool {
        self.outcome.landed()
    }

    pub fn did_crit(&self) -> bool {
        self.outcome.did_crit()
    }
}

/// How the hit/crit table is consulted for a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeRule {
    /// Miss roll against the target's table, then crit roll.
    MagicHitAndCrit,
    /// Miss roll only; landed hits never crit.
    MagicHit,
    /// Cannot miss or crit (fixed-outcome effects).
    AlwaysHit,
}

impl Simulation {
    /// Register a spell on a unit. All units must already exist: a periodic
    /// effect registers its bookkeeping aura on every potential target here.
    pub fn register_spell(&mut self, unit: UnitId, config: SpellConfig) -> SpellId {
        assert!(
            !config.name.is_empty(),
            "spell registered without a name on unit {}",
            self.unit(unit).name
        );
        let unit_count = self.units.len();
        let dot_config = config.dot.clone();

        let u = self.unit_mut(unit);
        u.spells.push(Spell {
            config,
            metrics: vec![TargetMetrics::default(); unit_count],
            dots: Vec::new(),
            last_cast_cost: 0.0,
        });
        let id = SpellId {
            unit,
            idx: u.spells.len() - 1,
        };

        if let Some(dot_config) = dot_config {
            let dots = self.register_dot_instances(id, &dot_config);
            self.units[unit.0].spells[id.idx].dots = dots;
        }
        id
    }

    pub fn spell(&self, id: SpellId) -> &Spell {
        &self.unit(id.unit).spells[id.idx]
    }

    pub(crate) fn spell_mut(&mut self, id: SpellId) -> &mut Spell {
        &mut self.units[id.unit.0].spells[id.idx]
    }

    /// Resource cost for a cast right now, after modifiers, floored at zero.
    pub fn spell_cost(&self, id: SpellId) -> f64 {
        use super::mods::SpellModKind::{CostFlat, CostPct};
        let s = self.spell(id);
        if s.config.mana_cost == 0.0 {
            return 0.0;
        }
        let base = s.config.mana_cost * self.unit(id.unit).base_mana();
        let pct = self.mod_total(id, CostPct);
        let flat = self.mod_total(id, CostFlat);
        (base * (1.0 + pct) + flat).max(0.0)
    }

    /// Cast time right now: modifiers, then haste.
    pub fn spell_cast_time(&self, id: SpellId) -> SimTime {
        use super::mods::SpellModKind::CastTimePct;
        let s = self.spell(id);
        let base = s.config.cast.cast_time;
        if base == SimTime::ZERO {
            return SimTime::ZERO;
        }
        let pct = self.mod_total(id, CastTimePct);
        let speed = self.unit(id.unit).stats.cast_speed;
        SimTime::from_secs_f64((base.as_secs_f64() * (1.0 + pct) / speed).max(0.0))
    }

    /// Crit chance for this spell: caster stat plus modifiers, as a fraction.
    pub fn spell_crit_chance(&self, id: SpellId) -> f64 {
        use super::mods::SpellModKind::BonusCritPct;
        let base = self.unit(id.unit).stats.spell_crit;
        (base + self.mod_total(id, BonusCritPct)).clamp(0.0, 1.0)
    }

    /// The multiplicative damage factor currently in effect for this spell.
    pub fn spell_damage_multiplier(&self, id: SpellId) -> f64 {
        use super::mods::SpellModKind::DamageDonePct;
        let s = self.spell(id);
        s.config.damage_multiplier * (1.0 + self.mod_total(id, DamageDonePct))
    }

    pub fn spell_is_ready(&self, id: SpellId) -> bool {
        let now = self.current_time();
        let s = self.spell(id);
        let u = self.unit(id.unit);
        if let Some(cd) = s.config.cast.cooldown {
            if !cd.is_ready(&u.timers, now) {
                return false;
            }
        }
        if s.config.cast.gcd > SimTime::ZERO && u.gcd_ready_at > now {
            return false;
        }
        now >= u.cast_complete_at
    }

    /// Attempt a cast. Returns false without consuming anything when a gate
    /// blocks it.
    pub fn cast(&mut self, id: SpellId, target: UnitId) -> bool {
        let now = self.current_time();

        if let Some(cond) = self.spell(id).config.extra_cast_condition.clone() {
            if !cond(self, target) {
                return false;
            }
        }
        if !self.spell_is_ready(id) {
            return false;
        }
        let cost = self.spell_cost(id);
        if self.unit(id.unit).mana() < cost {
            return false;
        }

        // The cast is happening: pay, arm timers, occupy the GCD.
        let caster = id.unit;
        let gcd = self.spell(id).config.cast.gcd;
        let cooldown = self.spell(id).config.cast.cooldown;
        let cast_time = self.spell_cast_time(id);

        {
            let u = self.unit_mut(caster);
            u.spend_mana_raw(cost);
            if let Some(cd) = cooldown {
                cd.arm(&mut u.timers, now);
            }
            if gcd > SimTime::ZERO {
                // Haste shortens the GCD down to a floor.
                let hasted = SimTime::from_secs_f64(gcd.as_secs_f64() / u.stats.cast_speed);
                u.gcd_ready_at = now + hasted.max(GCD_MIN);
            }
            if cast_time > SimTime::ZERO {
                u.cast_complete_at = now + cast_time;
            }
        }
        self.spell_mut(id).last_cast_cost = cost;
        self.spell_mut(id).metrics[target.0].casts += 1;

        if self.log_enabled() {
            let name = self.spell(id).config.name.clone();
            self.log(format!("cast start: {name} (cost {cost:.1}, cast time {cast_time})"));
        }

        if cast_time == SimTime::ZERO {
            self.complete_cast(id, target);
        } else {
            self.schedule_delayed(now + cast_time, PRIORITY_DEFAULT, move |sim| {
                sim.complete_cast(id, target);
            });
        }
        true
    }

    fn complete_cast(&mut self, id: SpellId, target: UnitId) {
        self.dispatch_cast_complete(id.unit, id);
        if let Some(apply) = self.spell(id).config.apply_effects.clone() {
            apply(self, target, id);
        }
    }

    /// Resolve an outcome and compute damage, incrementing metrics. The
    /// returned result still has to be dealt.
    pub fn calc_damage(
        &mut self,
        id: SpellId,
        target: UnitId,
        base_damage: f64,
        rule: OutcomeRule,
    ) -> SpellResult {
        let outcome = self.resolve_outcome(id, target, rule);
        self.finish_damage_calc(id, target, base_damage, outcome)
    }

    /// Resolve the hit/crit table only.
    pub fn resolve_outcome(&mut self, id: SpellId, target: UnitId, rule: OutcomeRule) -> SpellOutcome {
        match rule {
            OutcomeRule::AlwaysHit => SpellOutcome::Hit,
            OutcomeRule::MagicHit => {
                if self.magic_hit_check(id, target) {
                    SpellOutcome::Hit
                } else {
                    SpellOutcome::Miss
                }
            }
            OutcomeRule::MagicHitAndCrit => {
                if !self.magic_hit_check(id, target) {
                    SpellOutcome::Miss
                } else {
                    let crit_chance = self.spell_crit_chance(id);
                    if self.rng.random_float("Magical Crit Roll") < crit_chance {
                        SpellOutcome::Crit
                    } else {
                        SpellOutcome::Hit
                    }
                }
            }
        }
    }

    /// Single miss-table draw against the target.
    pub fn magic_hit_check(&mut self, _id: SpellId, target: UnitId) -> bool {
        let miss = self.unit(target).spell_miss_chance;
        miss <= 0.0 || self.rng.random_float("Magical Hit Roll") >= miss
    }

    /// Damage math plus resolution-time metrics for an already-known
    /// outcome. Channels that snapshot their crit chance resolve the outcome
    /// themselves and come through here.
    pub fn finish_damage_calc(
        &mut self,
        id: SpellId,
        target: UnitId,
        base_damage: f64,
        outcome: SpellOutcome,
    ) -> SpellResult {
        use super::mods::SpellModKind::DamageDoneFlat;

        let (damage, threat) = match outcome {
            SpellOutcome::Miss => (0.0, 0.0),
            _ => {
                let s = self.spell(id);
                let spell_power = self.unit(id.unit).stats.spell_power;
                let base_total = base_damage + s.config.bonus_coefficient * spell_power;
                let mut damage = base_total * self.spell_damage_multiplier(id)
                    + self.mod_total(id, DamageDoneFlat);
                if outcome == SpellOutcome::Crit {
                    damage *= self.spell(id).config.crit_multiplier;
                }
                let threat = damage * self.spell(id).config.threat_multiplier;
                (damage, threat)
            }
        };

        self.record_resolution(id, target, outcome, damage, threat);
        SpellResult {
            target,
            outcome,
            damage,
            threat,
        }
    }

    fn record_resolution(
        &mut self,
        id: SpellId,
        target: UnitId,
        outcome: SpellOutcome,
        damage: f64,
        threat: f64,
    ) {
        {
            let m = &mut self.spell_mut(id).metrics[target.0];
            match outcome {
                SpellOutcome::Hit => m.hits += 1,
                SpellOutcome::Crit => m.crits += 1,
                SpellOutcome::Miss => m.misses += 1,
            }
            m.damage += damage;
            m.threat += threat;
        }
        let totals = &mut self.units[id.unit.0].metrics.iteration;
        totals.damage_dealt += damage;
        totals.threat += threat;

        if self.log_enabled() {
            let name = self.spell(id).config.name.clone();
            let target_name = self.unit(target).name.clone();
            self.log(format!(
                "{name} {outcome:?} on {target_name} for {damage:.1}"
            ));
        }
    }

    /// Deliver a resolved result: the target takes the damage and hit hooks
    /// fire. Consumes the result.
    pub fn deal_damage(&mut self, id: SpellId, result: SpellResult) {
        if result.damage > 0.0 {
            let target = self.unit_mut(result.target);
            target.take_damage(result.damage);
            target.metrics.iteration.damage_taken += result.damage;
        }
        self.dispatch_spell_hit_dealt(id.unit, id, &result);
    }

    /// Resolve and deliver in one step, for instant spells.
    pub fn calc_and_deal_damage(
        &mut self,
        id: SpellId,
        target: UnitId,
        base_damage: f64,
        rule: OutcomeRule,
    ) -> SpellOutcome {
        let result = self.calc_damage(id, target, base_damage, rule);
        let outcome = result.outcome;
        self.deal_damage(id, result);
        outcome
    }

    /// Periodic tick resolution. The caller passes the final pre-crit
    /// damage: the base was snapshotted at apply time and any tick-time
    /// multiplier is already folded in. No modifier aggregation here.
    pub fn calc_periodic_damage(&mut self, id: SpellId, target: UnitId, damage: f64) -> SpellResult {
        let threat = damage * self.spell(id).config.threat_multiplier;
        self.record_resolution(id, target, SpellOutcome::Hit, damage, threat);
        SpellResult {
            target,
            outcome: SpellOutcome::Hit,
            damage,
            threat,
        }
    }

    /// Deliver a periodic tick and fire periodic-damage hooks.
    pub fn deal_periodic_damage(&mut self, id: SpellId, result: SpellResult) {
        if result.damage > 0.0 {
            let target = self.unit_mut(result.target);
            target.take_damage(result.damage);
            target.metrics.iteration.damage_taken += result.damage;
        }
        self.dispatch_periodic_damage_dealt(id.unit, id, &result);
    }

    /// Healing resolves like damage but against the friendly target's
    /// health; it cannot miss.
    pub fn calc_and_deal_healing(&mut self, id: SpellId, target: UnitId, base_healing: f64) {
        let s = self.spell(id);
        let spell_power = self.unit(id.unit).stats.spell_power;
        let base_total = base_healing + s.config.bonus_coefficient * spell_power;
        let healing = base_total * self.spell_damage_multiplier(id);

        self.units[id.unit.0].metrics.iteration.healing_dealt += healing;
        self.unit_mut(target).heal(healing);
        if self.log_enabled() {
            let name = self.spell(id).config.name.clone();
            self.log(format!("{name} heals for {healing:.1}"));
        }
    }

    /// Defer delivery for missile flight. Metrics were already finalized at
    /// resolution; only the damage event waits.
    pub fn wait_travel_time(&mut self, id: SpellId, f: impl FnOnce(&mut Simulation) + 'static) {
        let speed = self.spell(id).config.missile_speed;
        let now = self.current_time();
        if speed <= 0.0 {
            f(self);
            return;
        }
        let distance = self.unit(id.unit).distance;
        let at = now + SimTime::from_secs_f64(distance / speed);
        self.schedule_delayed(at, PRIORITY_DEFAULT, f);
    }

    /// Spend mana, attributing it to an action's resource metrics.
    pub fn spend_mana(&mut self, unit: UnitId, amount: f64, metrics: ResourceMetricsId) {
        let u = self.unit_mut(unit);
        u.spend_mana_raw(amount);
        u.metrics.resources[metrics.0].spent += amount;
    }

    /// Restore mana, attributing it to an action's resource metrics.
    pub fn add_mana(&mut self, unit: UnitId, amount: f64, metrics: ResourceMetricsId) {
        let u = self.unit_mut(unit);
        u.add_mana_raw(amount);
        u.metrics.resources[metrics.0].gained += amount;
    }
}
