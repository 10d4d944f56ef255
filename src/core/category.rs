//! Mask types used for spell classification and listener self-filtering.
//!
//! Hook listeners and stat modifiers do not get pre-filtered by the
//! dispatcher; each one tests the firing spell against its own masks. All
//! three masks are explicit newtypes with set-membership operations so the
//! matching rules stay auditable.

use std::ops::BitOr;

/// Damage school classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SchoolMask(u8);

impl SchoolMask {
    pub const NONE: SchoolMask = SchoolMask(0);
    pub const PHYSICAL: SchoolMask = SchoolMask(1 << 0);
    pub const ARCANE: SchoolMask = SchoolMask(1 << 1);
    pub const FIRE: SchoolMask = SchoolMask(1 << 2);
    pub const FROST: SchoolMask = SchoolMask(1 << 3);
    pub const NATURE: SchoolMask = SchoolMask(1 << 4);
    pub const SHADOW: SchoolMask = SchoolMask(1 << 5);
    pub const HOLY: SchoolMask = SchoolMask(1 << 6);

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if the two masks share any school.
    pub const fn matches(self, other: SchoolMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for SchoolMask {
    type Output = SchoolMask;

    fn bitor(self, rhs: SchoolMask) -> SchoolMask {
        SchoolMask(self.0 | rhs.0)
    }
}

/// What kind of combat event a spell's hits count as, for proc filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ProcMask(u32);

impl ProcMask {
    pub const NONE: ProcMask = ProcMask(0);
    pub const SPELL_DAMAGE: ProcMask = ProcMask(1 << 0);
    pub const SPELL_HEALING: ProcMask = ProcMask(1 << 1);
    pub const MELEE: ProcMask = ProcMask(1 << 2);
    pub const RANGED: ProcMask = ProcMask(1 << 3);
    /// Damage originating from another proc; excluded from most triggers.
    pub const PROC: ProcMask = ProcMask(1 << 4);
    /// Internal helper spells that a rotation never casts directly.
    pub const NOT_IN_SPELLBOOK: ProcMask = ProcMask(1 << 5);

    pub const MELEE_OR_RANGED: ProcMask = ProcMask(1 << 2 | 1 << 3);

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn matches(self, other: ProcMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for ProcMask {
    type Output = ProcMask;

    fn bitor(self, rhs: ProcMask) -> ProcMask {
        ProcMask(self.0 | rhs.0)
    }
}

/// Per-catalog spell category bitmask. The engine assigns no meaning to
/// individual bits; ability definitions declare their own categories and
/// modifiers/triggers match against them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SpellCategory(u64);

impl SpellCategory {
    pub const NONE: SpellCategory = SpellCategory(0);

    pub const fn bit(n: u32) -> SpellCategory {
        SpellCategory(1 << n)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn matches(self, other: SpellCategory) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for SpellCategory {
    type Output = SpellCategory;

    fn bitor(self, rhs: SpellCategory) -> SpellCategory {
        SpellCategory(self.0 | rhs.0)
    }
}
