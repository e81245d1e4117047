//! Backpressure monitor.
//!
//! Two-state machine shared by every policy. The controller is blocked once its
//! pending depth rises above the high watermark and stays blocked until an issue
//! brings the depth below the low watermark. On release, the length of the
//! blocked period is added to a running total and reported to the bus.
//!
//! Out-of-state transitions (`set_blocked` while blocked, `set_unblocked` while
//! not blocked) are scheduling bugs and are reported as errors, never ignored.

use tracing::debug;

use crate::common::{ControllerError, Cycle};
use crate::soc::traits::BusObserver;

/// Hysteretic high/low watermark tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backpressure {
    high: usize,
    low: usize,
    blocked: bool,
    blocked_since: Cycle,
    total_blocked: Cycle,
    episodes: u64,
}

impl Backpressure {
    /// Creates an unblocked monitor.
    ///
    /// # Arguments
    ///
    /// * `high` - Depth strictly above which backpressure is asserted.
    /// * `low` - Depth strictly below which backpressure is released.
    pub const fn new(high: usize, low: usize) -> Self {
        Self {
            high,
            low,
            blocked: false,
            blocked_since: 0,
            total_blocked: 0,
            episodes: 0,
        }
    }

    /// Returns `true` while backpressure is asserted.
    #[inline]
    pub const fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// High watermark.
    #[inline]
    pub const fn high(&self) -> usize {
        self.high
    }

    /// Low watermark.
    #[inline]
    pub const fn low(&self) -> usize {
        self.low
    }

    /// Cycle at which the current blocked period began (meaningless when unblocked).
    #[inline]
    pub const fn blocked_since(&self) -> Cycle {
        self.blocked_since
    }

    /// Sum of all completed blocked periods.
    #[inline]
    pub const fn total_blocked(&self) -> Cycle {
        self.total_blocked
    }

    /// Number of completed blocked periods.
    #[inline]
    pub const fn episodes(&self) -> u64 {
        self.episodes
    }

    /// Enters the blocked state at cycle `now`.
    ///
    /// # Errors
    ///
    /// `ControllerError::AlreadyBlocked` if already blocked.
    pub fn set_blocked(
        &mut self,
        now: Cycle,
        bus: &mut dyn BusObserver,
    ) -> Result<(), ControllerError> {
        if self.blocked {
            return Err(ControllerError::AlreadyBlocked);
        }
        self.blocked = true;
        self.blocked_since = now;
        debug!(now, high = self.high, "memory controller blocked");
        bus.on_blocked(now);
        Ok(())
    }

    /// Leaves the blocked state at cycle `now` and reports the period to the bus.
    ///
    /// # Returns
    ///
    /// Length of the blocked period just ended.
    ///
    /// # Errors
    ///
    /// `ControllerError::NotBlocked` if not blocked.
    pub fn set_unblocked(
        &mut self,
        now: Cycle,
        bus: &mut dyn BusObserver,
    ) -> Result<Cycle, ControllerError> {
        if !self.blocked {
            return Err(ControllerError::NotBlocked);
        }
        let delta = now.saturating_sub(self.blocked_since);
        self.blocked = false;
        self.total_blocked += delta;
        self.episodes += 1;
        debug!(now, blocked_cycles = delta, "memory controller unblocked");
        bus.on_unblocked(now, delta);
        Ok(delta)
    }

    /// Applies the high watermark after an admission left `depth` pending requests.
    ///
    /// # Returns
    ///
    /// `true` if this call asserted backpressure.
    ///
    /// # Errors
    ///
    /// Propagates out-of-state transitions.
    pub fn after_insert(
        &mut self,
        depth: usize,
        now: Cycle,
        bus: &mut dyn BusObserver,
    ) -> Result<bool, ControllerError> {
        if depth > self.high && !self.blocked {
            self.set_blocked(now, bus)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Applies the low watermark after an issue left `depth` pending requests.
    ///
    /// # Returns
    ///
    /// The blocked period length if this call released backpressure.
    ///
    /// # Errors
    ///
    /// Propagates out-of-state transitions.
    pub fn after_issue(
        &mut self,
        depth: usize,
        now: Cycle,
        bus: &mut dyn BusObserver,
    ) -> Result<Option<Cycle>, ControllerError> {
        if depth < self.low && self.blocked {
            return self.set_unblocked(now, bus).map(Some);
        }
        Ok(None)
    }
}
