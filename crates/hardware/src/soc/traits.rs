//! Bus-side callback trait.
//!
//! This module defines the interface a controller uses to talk back to the bus that owns it:
//! 1. **Backpressure:** Notification when the controller starts refusing new traffic.
//! 2. **Stall accounting:** The number of cycles a blocked period lasted, reported when it ends.
//!
//! The bus passes itself as `&mut dyn BusObserver` into every `insert`/`next` call,
//! so controllers hold no back-reference to their owner.

use crate::common::Cycle;

/// Receiver of backpressure transitions from a memory controller.
pub trait BusObserver {
    /// Called when the controller asserts backpressure at cycle `now`.
    fn on_blocked(&mut self, now: Cycle) {
        let _ = now;
    }

    /// Called when the controller releases backpressure.
    ///
    /// # Arguments
    ///
    /// * `now` - Cycle at which the block ended.
    /// * `blocked_cycles` - Length of the blocked period just ended.
    fn on_unblocked(&mut self, now: Cycle, blocked_cycles: Cycle);
}

/// Observer that discards every notification.
///
/// Useful when the caller polls `is_blocked` instead of listening.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl BusObserver for NullObserver {
    fn on_unblocked(&mut self, _now: Cycle, _blocked_cycles: Cycle) {}
}

/// Observer that only accumulates stall cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StallCounter {
    /// Completed blocked periods.
    pub episodes: u64,
    /// Sum of all completed blocked periods, in cycles.
    pub blocked_cycles: Cycle,
}

impl BusObserver for StallCounter {
    fn on_unblocked(&mut self, _now: Cycle, blocked_cycles: Cycle) {
        self.episodes += 1;
        self.blocked_cycles += blocked_cycles;
    }
}
