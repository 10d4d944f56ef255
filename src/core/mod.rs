//! The deterministic combat engine.
//!
//! Everything that runs inside one iteration lives here: the millisecond
//! clock and action queue, units with their auras, spells, modifiers and
//! timers, and the metrics that survive across iterations.

pub mod aura;
pub mod category;
pub mod dot;
pub mod metrics;
pub mod mods;
pub mod proc;
pub mod rng;
pub mod scheduler;
pub mod sim;
pub mod spell;
pub mod time;
pub mod timers;
pub mod unit;

pub use aura::{make_permanent, AuraConfig, AuraDuration, AuraId};
pub use category::{ProcMask, SchoolMask, SpellCategory};
pub use dot::{DotConfig, RefreshPolicy};
pub use metrics::{Distribution, TargetMetrics, UnitMetricsSummary};
pub use mods::{SpellModConfig, SpellModId, SpellModKind};
pub use proc::{OutcomeFilter, ProcCallback, ProcTriggerConfig};
pub use rng::RandomStream;
pub use scheduler::PendingActionId;
pub use sim::{Encounter, SimOptions, Simulation};
pub use spell::{
    ActionId, CastConfig, OutcomeRule, SpellConfig, SpellFlags, SpellId, SpellOutcome,
    SpellResult, GCD_DEFAULT, GCD_MIN,
};
pub use time::{
    ActionPriority, SimTime, PRIORITY_AFTER_DOT, PRIORITY_AURA_EXPIRE, PRIORITY_DEFAULT,
    PRIORITY_DOT, PRIORITY_ROTATION,
};
pub use timers::{Cooldown, TimerBank, TimerId};
pub use unit::{RotationFn, StatBlock, Unit, UnitConfig, UnitId};
