//! Named countdown timers and spell cooldowns.
//!
//! A timer is just a "ready at" timestamp owned by a unit; spells and
//! shared-cooldown groups reference timers by id so two spells can share one.

use super::time::SimTime;

/// Index into a unit's timer bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub(crate) usize);

/// Per-unit collection of timers. All timers read "ready" after an
/// iteration reset.
#[derive(Debug, Default)]
pub struct TimerBank {
    ready_at: Vec<SimTime>,
}

impl TimerBank {
    pub fn new_timer(&mut self) -> TimerId {
        self.ready_at.push(SimTime::ZERO);
        TimerId(self.ready_at.len() - 1)
    }

    pub fn is_ready(&self, id: TimerId, now: SimTime) -> bool {
        self.ready_at[id.0] <= now
    }

    pub fn ready_at(&self, id: TimerId) -> SimTime {
        self.ready_at[id.0]
    }

    pub fn set(&mut self, id: TimerId, ready_at: SimTime) {
        self.ready_at[id.0] = ready_at;
    }

    /// Make the timer immediately ready (a proc clearing a cooldown).
    pub fn reset(&mut self, id: TimerId) {
        self.ready_at[id.0] = SimTime::ZERO;
    }

    /// Iteration reset: every timer becomes ready.
    pub fn reset_all(&mut self) {
        for t in &mut self.ready_at {
            *t = SimTime::ZERO;
        }
    }
}

/// A spell cooldown: a timer plus the duration armed on each use.
#[derive(Debug, Clone, Copy)]
pub struct Cooldown {
    pub timer: TimerId,
    pub duration: SimTime,
}

impl Cooldown {
    pub fn is_ready(&self, timers: &TimerBank, now: SimTime) -> bool {
        timers.is_ready(self.timer, now)
    }

    pub fn arm(&self, timers: &mut TimerBank, now: SimTime) {
        timers.set(self.timer, now + self.duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_arms_and_recovers() {
        let mut bank = TimerBank::default();
        let cd = Cooldown {
            timer: bank.new_timer(),
            duration: SimTime::from_secs(30),
        };

        assert!(cd.is_ready(&bank, SimTime::ZERO));
        cd.arm(&mut bank, SimTime::from_secs(5));
        assert!(!cd.is_ready(&bank, SimTime::from_secs(34)));
        assert!(cd.is_ready(&bank, SimTime::from_secs(35)));
    }

    #[test]
    fn test_reset_clears_remaining_cooldown() {
        let mut bank = TimerBank::default();
        let cd = Cooldown {
            timer: bank.new_timer(),
            duration: SimTime::from_secs(8),
        };
        cd.arm(&mut bank, SimTime::ZERO);
        bank.reset(cd.timer);
        assert!(cd.is_ready(&bank, SimTime::ZERO));
    }

    #[test]
    fn test_shared_timer_gates_both_users() {
        let mut bank = TimerBank::default();
        let shared = bank.new_timer();
        let a = Cooldown { timer: shared, duration: SimTime::from_secs(10) };
        let b = Cooldown { timer: shared, duration: SimTime::from_secs(4) };

        a.arm(&mut bank, SimTime::ZERO);
        assert!(!b.is_ready(&bank, SimTime::from_secs(9)));
        assert!(b.is_ready(&bank, SimTime::from_secs(10)));
    }
}
