//! Stat modifiers matched against spells by category/school masks.
//!
//! Static mods are active from registration for the life of the unit.
//! Dynamic mods are toggled by other effects (usually procs); toggling an
//! already-toggled mod is a no-op. Aggregation is recomputed at the moment a
//! cast consults cost, cast time, crit chance or damage — never cached.

use super::category::{SchoolMask, SpellCategory};
use super::sim::Simulation;
use super::spell::SpellId;
use super::unit::UnitId;

/// Which spell attribute the modifier adjusts, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpellModKind {
    /// Percentage change to cast time (-0.05 = 5% faster).
    CastTimePct,
    /// Percentage change to resource cost.
    CostPct,
    /// Flat change to resource cost.
    CostFlat,
    /// Additive crit chance, as a fraction (0.05 = +5%).
    BonusCritPct,
    /// Additive percentage damage (0.01 = +1%).
    DamageDonePct,
    /// Flat damage added after multipliers.
    DamageDoneFlat,
}

#[derive(Debug, Clone, Copy)]
pub struct SpellModConfig {
    pub kind: SpellModKind,
    /// Empty mask matches every category.
    pub class_mask: SpellCategory,
    /// Empty mask matches every school.
    pub school: SchoolMask,
    pub value: f64,
}

impl SpellModConfig {
    pub fn new(kind: SpellModKind, value: f64) -> Self {
        Self {
            kind,
            class_mask: SpellCategory::NONE,
            school: SchoolMask::NONE,
            value,
        }
    }

    pub fn with_class_mask(mut self, mask: SpellCategory) -> Self {
        self.class_mask = mask;
        self
    }

    pub fn with_school(mut self, school: SchoolMask) -> Self {
        self.school = school;
        self
    }
}

pub(crate) struct SpellMod {
    pub(crate) config: SpellModConfig,
    pub(crate) active: bool,
    pub(crate) dynamic: bool,
}

impl SpellMod {
    pub(crate) fn matches(&self, class_mask: SpellCategory, school: SchoolMask) -> bool {
        let class_ok =
            self.config.class_mask.is_empty() || self.config.class_mask.matches(class_mask);
        let school_ok = self.config.school.is_empty() || self.config.school.matches(school);
        class_ok && school_ok
    }
}

/// Handle to a registered modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpellModId {
    pub(crate) unit: UnitId,
    pub(crate) idx: usize,
}

impl Simulation {
    /// Register a modifier that is active for the unit's whole lifetime.
    pub fn add_static_mod(&mut self, unit: UnitId, config: SpellModConfig) -> SpellModId {
        self.push_mod(unit, config, true)
    }

    /// Register a modifier that starts inactive and is toggled explicitly.
    pub fn add_dynamic_mod(&mut self, unit: UnitId, config: SpellModConfig) -> SpellModId {
        self.push_mod(unit, config, false)
    }

    fn push_mod(&mut self, unit: UnitId, config: SpellModConfig, active: bool) -> SpellModId {
        let u = self.unit_mut(unit);
        u.mods.push(SpellMod {
            config,
            active,
            dynamic: !active,
        });
        SpellModId {
            unit,
            idx: u.mods.len() - 1,
        }
    }

    pub fn mod_is_active(&self, id: SpellModId) -> bool {
        self.unit(id.unit).mods[id.idx].active
    }

    /// Activate a dynamic mod. No-op when already active.
    pub fn activate_mod(&mut self, id: SpellModId) {
        let m = &mut self.units[id.unit.0].mods[id.idx];
        debug_assert!(m.dynamic, "activate called on a static mod");
        m.active = true;
    }

    /// Deactivate a dynamic mod. No-op when already inactive.
    pub fn deactivate_mod(&mut self, id: SpellModId) {
        let m = &mut self.units[id.unit.0].mods[id.idx];
        debug_assert!(m.dynamic, "deactivate called on a static mod");
        m.active = false;
    }

    /// Sum of all currently-active matching contributions of one kind for a
    /// spell. Recomputed on every consult.
    pub(crate) fn mod_total(&self, spell: SpellId, kind: SpellModKind) -> f64 {
        let s = self.spell(spell);
        if s.config.flags.ignores_modifiers() {
            return 0.0;
        }
        let class_mask = s.config.class_mask;
        let school = s.config.school;
        self.unit(spell.unit)
            .mods
            .iter()
            .filter(|m| m.active && m.config.kind == kind && m.matches(class_mask, school))
            .map(|m| m.config.value)
            .sum()
    }
}
