//! Simulated time and action ordering.
//!
//! The engine runs on an integer millisecond clock so that scheduling math is
//! exact and runs are bit-for-bit reproducible across platforms. Fractional
//! values (haste-scaled tick intervals, travel times) are rounded to the
//! millisecond at the point they are converted into a `SimTime`.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};

/// A point in (or span of) simulated time, in whole milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimTime(i64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    pub const fn from_millis(ms: i64) -> Self {
        SimTime(ms)
    }

    pub const fn from_secs(secs: i64) -> Self {
        SimTime(secs * 1000)
    }

    /// Convert fractional seconds, rounding to the nearest millisecond.
    pub fn from_secs_f64(secs: f64) -> Self {
        SimTime((secs * 1000.0).round() as i64)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub fn min(self, other: SimTime) -> SimTime {
        SimTime(self.0.min(other.0))
    }

    pub fn max(self, other: SimTime) -> SimTime {
        SimTime(self.0.max(other.0))
    }
}

impl Add for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0 + rhs.0)
    }
}

impl AddAssign for SimTime {
    fn add_assign(&mut self, rhs: SimTime) {
        self.0 += rhs.0;
    }
}

impl Sub for SimTime {
    type Output = SimTime;

    fn sub(self, rhs: SimTime) -> SimTime {
        SimTime(self.0 - rhs.0)
    }
}

impl Mul<u32> for SimTime {
    type Output = SimTime;

    fn mul(self, rhs: u32) -> SimTime {
        SimTime(self.0 * rhs as i64)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

/// Tie-break rank for actions scheduled at the identical timestamp.
///
/// Lower values fire first. Among equal (time, priority) pairs the queue is
/// FIFO, so an effect that must run strictly after another at the same
/// timestamp schedules itself at a higher priority value.
pub type ActionPriority = i32;

/// Default priority for ad-hoc delayed actions.
pub const PRIORITY_DEFAULT: ActionPriority = 0;
/// Periodic-effect ticks.
pub const PRIORITY_DOT: ActionPriority = 10;
/// Runs after any tick scheduled at the same timestamp.
pub const PRIORITY_AFTER_DOT: ActionPriority = 11;
/// Aura self-expiry, after damage events at the same instant.
pub const PRIORITY_AURA_EXPIRE: ActionPriority = 20;
/// Rotation wake-ups, last at any given instant.
pub const PRIORITY_ROTATION: ActionPriority = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millisecond_arithmetic() {
        let t = SimTime::from_secs(2) + SimTime::from_millis(700);
        assert_eq!(t.as_millis(), 2700);
        assert_eq!((t - SimTime::from_millis(700)).as_millis(), 2000);
    }

    #[test]
    fn test_fractional_seconds_round_to_millis() {
        assert_eq!(SimTime::from_secs_f64(0.7005).as_millis(), 701);
        assert_eq!(SimTime::from_secs_f64(1.0 / 3.0).as_millis(), 333);
    }

    #[test]
    fn test_ordering() {
        assert!(SimTime::from_millis(999) < SimTime::from_secs(1));
        assert_eq!(
            SimTime::from_secs(3).max(SimTime::from_millis(3500)).as_millis(),
            3500
        );
    }
}
