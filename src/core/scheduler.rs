//! The event scheduler driving simulated time.
//!
//! A run is a loop of "pop the earliest pending action, advance the clock to
//! its timestamp, fire it". Ordering is total and deterministic: earliest
//! time first, then lowest priority value, then FIFO insertion order.
//!
//! Cancellation marks a queued action inert rather than removing it; the
//! entry is skipped when it surfaces. This keeps the heap invariants intact
//! while hooks are firing mid-iteration.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use super::sim::Simulation;
use super::time::{ActionPriority, SimTime};

/// One-shot deferred callback. Consumed when fired.
pub type Action = Box<dyn FnOnce(&mut Simulation)>;

/// Handle for cancelling a pending action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PendingActionId(u64);

struct PendingAction {
    time: SimTime,
    priority: ActionPriority,
    seq: u64,
    action: Action,
}

impl PartialEq for PendingAction {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for PendingAction {}

impl PartialOrd for PendingAction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingAction {
    // BinaryHeap is a max-heap; invert so the earliest (time, priority, seq)
    // surfaces first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.priority.cmp(&self.priority))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
pub struct ActionQueue {
    heap: BinaryHeap<PendingAction>,
    cancelled: HashSet<u64>,
    next_seq: u64,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pending action. Scheduling into the past is a configuration
    /// error in the ability definition and aborts the run.
    pub fn schedule(
        &mut self,
        now: SimTime,
        time: SimTime,
        priority: ActionPriority,
        action: Action,
    ) -> PendingActionId {
        assert!(
            time >= now,
            "action scheduled into the past: now={now}, at={time}"
        );
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(PendingAction {
            time,
            priority,
            seq,
            action,
        });
        PendingActionId(seq)
    }

    /// Mark a queued action inert. Unknown or already-fired ids are ignored.
    pub fn cancel(&mut self, id: PendingActionId) {
        self.cancelled.insert(id.0);
    }

    /// Pop the next live action, discarding any cancelled entries on the way.
    pub fn pop(&mut self) -> Option<(SimTime, Action)> {
        while let Some(pending) = self.heap.pop() {
            if self.cancelled.remove(&pending.seq) {
                continue;
            }
            return Some((pending.time, pending.action));
        }
        None
    }

    /// Timestamp of the next live action without firing it.
    pub fn peek_time(&mut self) -> Option<SimTime> {
        while let Some(pending) = self.heap.peek() {
            if self.cancelled.contains(&pending.seq) {
                let seq = pending.seq;
                self.heap.pop();
                self.cancelled.remove(&seq);
                continue;
            }
            return Some(pending.time);
        }
        None
    }

    pub fn is_empty(&mut self) -> bool {
        self.peek_time().is_none()
    }

    /// Drop all pending actions; sequence numbers keep counting so ids from
    /// a previous iteration can never collide with new ones.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.cancelled.clear();
    }
}
