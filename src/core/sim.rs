//! The simulation container: units, clock, queue, rng, and the iteration
//! loop.
//!
//! One `Simulation` owns everything for a run. Iteration `i` reseeds the rng
//! with `seed + i`, so a run of N iterations is exactly equivalent to two
//! runs of K and N-K iterations whose base seeds are advanced accordingly.
//! The reset-leakage suite depends on that equivalence.

use std::rc::Rc;

use super::metrics::{ActionMetricsSummary, ResourceMetricsId, UnitMetricsSummary};
use super::spell::ActionId;
use super::rng::RandomStream;
use super::scheduler::{ActionQueue, PendingActionId};
use super::time::{ActionPriority, SimTime, PRIORITY_ROTATION};
use super::unit::{RotationFn, Unit, UnitConfig, UnitId};

/// Wakeup step used when a rotation neither casts nor requests a time.
const ROTATION_IDLE_STEP: SimTime = SimTime::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct SimOptions {
    pub seed: u64,
    pub iterations: u32,
    pub duration: SimTime,
    pub log_enabled: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            seed: 1,
            iterations: 1,
            duration: SimTime::from_secs(60),
            log_enabled: false,
        }
    }
}

/// The enemy side of the fight.
#[derive(Debug, Default)]
pub struct Encounter {
    pub(crate) targets: Vec<UnitId>,
    /// Total damage an area effect may deal per application; zero means
    /// uncapped.
    pub aoe_damage_cap: f64,
}

impl Encounter {
    pub fn targets(&self) -> &[UnitId] {
        &self.targets
    }

    /// Scale factor for one target's share of an area effect, such that the
    /// summed damage never exceeds the cap.
    pub fn aoe_cap_multiplier(&self, per_target_damage: f64) -> f64 {
        let total = per_target_damage * self.targets.len() as f64;
        if self.aoe_damage_cap <= 0.0 || total <= self.aoe_damage_cap {
            1.0
        } else {
            self.aoe_damage_cap / total
        }
    }
}

pub struct Simulation {
    pub(crate) options: SimOptions,
    current_time: SimTime,
    pub(crate) rng: RandomStream,
    pub(crate) queue: ActionQueue,
    pub(crate) units: Vec<Unit>,
    players: Vec<UnitId>,
    pub encounter: Encounter,
    iteration: u32,
    log: Vec<String>,
}

impl Simulation {
    pub fn new(options: SimOptions) -> Self {
        Self {
            options,
            current_time: SimTime::ZERO,
            rng: RandomStream::new(options.seed),
            queue: ActionQueue::new(),
            units: Vec::new(),
            players: Vec::new(),
            encounter: Encounter::default(),
            iteration: 0,
            log: Vec::new(),
        }
    }

    pub fn add_player(&mut self, config: UnitConfig) -> UnitId {
        let id = UnitId(self.units.len());
        self.units.push(Unit::new(config));
        self.players.push(id);
        id
    }

    pub fn add_enemy(&mut self, config: UnitConfig) -> UnitId {
        let id = UnitId(self.units.len());
        self.units.push(Unit::new(config));
        self.encounter.targets.push(id);
        id
    }

    pub fn unit(&self, id: UnitId) -> &Unit {
        &self.units[id.0]
    }

    pub fn unit_mut(&mut self, id: UnitId) -> &mut Unit {
        &mut self.units[id.0]
    }

    pub fn players(&self) -> &[UnitId] {
        &self.players
    }

    pub fn primary_target(&self) -> UnitId {
        self.encounter.targets[0]
    }

    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    pub fn duration(&self) -> SimTime {
        self.options.duration
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn seed(&self) -> u64 {
        self.options.seed
    }

    /// Uniform draw in [min, max), for base-damage ranges in ability code.
    pub fn roll(&mut self, min: f64, max: f64, label: &str) -> f64 {
        self.rng.roll(min, max, label)
    }

    pub fn proc(&mut self, chance: f64, label: &str) -> bool {
        self.rng.proc(chance, label)
    }

    /// Queue a one-shot action at an absolute timestamp.
    pub fn schedule_delayed(
        &mut self,
        at: SimTime,
        priority: ActionPriority,
        f: impl FnOnce(&mut Simulation) + 'static,
    ) -> PendingActionId {
        self.queue
            .schedule(self.current_time, at, priority, Box::new(f))
    }

    pub fn cancel_action(&mut self, id: PendingActionId) {
        self.queue.cancel(id);
    }

    /// Open a per-action resource metrics entry for mana attribution.
    pub fn new_resource_metrics(&mut self, unit: UnitId, action: ActionId) -> ResourceMetricsId {
        self.unit_mut(unit).metrics.new_resource_metrics(action)
    }

    /// Create a timer on a unit, for cooldowns or shared-cooldown groups.
    pub fn new_timer(&mut self, unit: UnitId) -> crate::core::timers::TimerId {
        self.unit_mut(unit).timers.new_timer()
    }

    /// Make a timer immediately ready, clearing any remaining cooldown.
    pub fn reset_timer(&mut self, unit: UnitId, timer: crate::core::timers::TimerId) {
        self.unit_mut(unit).timers.reset(timer);
    }

    pub fn timer_is_ready(&self, unit: UnitId, timer: crate::core::timers::TimerId) -> bool {
        self.unit(unit).timers.is_ready(timer, self.current_time)
    }

    pub fn set_rotation(&mut self, unit: UnitId, rotation: RotationFn) {
        self.unit_mut(unit).rotation = Some(rotation);
    }

    pub fn log_enabled(&self) -> bool {
        self.options.log_enabled
    }

    pub(crate) fn log(&mut self, message: String) {
        let stamped = format!("[{}] {message}", self.current_time);
        self.log.push(stamped);
    }

    pub fn logs(&self) -> &[String] {
        &self.log
    }

    pub fn take_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.log)
    }

    /// Run every configured iteration.
    pub fn run(&mut self) {
        for i in 0..self.options.iterations {
            self.run_iteration(i);
        }
    }

    fn run_iteration(&mut self, index: u32) {
        self.reset_iteration(index);

        while let Some((time, action)) = self.queue.pop() {
            if time > self.options.duration {
                break;
            }
            debug_assert!(time >= self.current_time, "time went backwards");
            self.current_time = time;
            action(self);
        }
        self.current_time = self.options.duration;

        let encounter_secs = self.options.duration.as_secs_f64();
        for unit in &mut self.units {
            unit.metrics.end_iteration(encounter_secs);
        }
    }

    /// Restore every piece of per-iteration state, then re-arm listeners.
    /// Anything mutated mid-iteration and not restored here is a leak the
    /// split-run tests will catch.
    fn reset_iteration(&mut self, index: u32) {
        self.iteration = index;
        self.current_time = SimTime::ZERO;
        self.queue.clear();
        // The retained log covers the last iteration only.
        self.log.clear();
        self.rng.reseed(self.options.seed + index as u64);

        for unit in &mut self.units {
            unit.reset_for_iteration();
        }
        for idx in 0..self.units.len() {
            self.reset_auras(UnitId(idx));
        }
        for idx in 0..self.units.len() {
            if self.units[idx].rotation.is_some() {
                self.schedule_rotation_wakeup(UnitId(idx), SimTime::ZERO);
            }
        }
    }

    fn schedule_rotation_wakeup(&mut self, unit: UnitId, at: SimTime) {
        if at > self.options.duration {
            return;
        }
        self.schedule_delayed(at, PRIORITY_ROTATION, move |sim| {
            sim.rotation_wakeup(unit);
        });
    }

    /// Run the unit's rotation, then schedule the next wakeup: either the
    /// time the rotation asked for, or when the unit can next act.
    fn rotation_wakeup(&mut self, unit: UnitId) {
        let rotation: Rc<_> = match &self.units[unit.0].rotation {
            Some(r) => r.clone(),
            None => return,
        };
        let requested = rotation(self, unit);

        let now = self.current_time;
        let u = &self.units[unit.0];
        let mut next = requested.unwrap_or_else(|| u.gcd_ready_at.max(u.cast_complete_at));
        if next <= now {
            next = now + ROTATION_IDLE_STEP;
        }
        self.schedule_rotation_wakeup(unit, next);
    }

    /// Converged per-unit averages once all iterations ran.
    pub fn unit_summary(&self, unit: UnitId) -> UnitMetricsSummary {
        let iterations = self.options.iterations.max(1) as f64;
        let u = self.unit(unit);

        let mut actions = Vec::with_capacity(u.spells.len());
        for spell in &u.spells {
            let mut total = crate::core::metrics::TargetMetrics::default();
            for m in &spell.metrics {
                total.casts += m.casts;
                total.hits += m.hits;
                total.crits += m.crits;
                total.misses += m.misses;
                total.damage += m.damage;
                total.threat += m.threat;
            }
            if total.casts == 0 && total.hits == 0 {
                continue;
            }
            actions.push(ActionMetricsSummary {
                action: spell.config.name.clone(),
                casts_per_iteration: total.casts as f64 / iterations,
                casts: total.casts,
                hits: total.hits,
                crits: total.crits,
                misses: total.misses,
                damage: total.damage,
            });
        }

        UnitMetricsSummary {
            dps: u.metrics.dps.avg(),
            dps_stdev: u.metrics.dps.stdev(),
            hps: u.metrics.hps.avg(),
            tps: u.metrics.tps.avg(),
            dtps: u.metrics.dtps.avg(),
            actions,
        }
    }
}
