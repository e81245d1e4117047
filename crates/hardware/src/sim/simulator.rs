//! Trace replay: a minimal bus driving one memory controller.
//!
//! Every cycle the bus:
//! 1. **Admits** arrivals whose cycle has come, unless the controller is blocked.
//! 2. **Issues** one operation if the DRAM channel is free and work is pending.
//! 3. **Occupies** the channel for the operation's `DramTiming` latency.
//!
//! The run ends once every entry has been admitted and the controller is empty.
//! Replay is deterministic: the same trace and controller state always produce
//! the same issue log.

use serde::Serialize;
use tracing::{debug, info};

use crate::common::{ControllerError, Cycle, Request};
use crate::soc::memory::{DramTiming, MemoryScheduler};
use crate::soc::traits::BusObserver;

use super::loader::Trace;

/// One operation issued by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IssueRecord {
    /// Cycle at which the operation left the controller.
    pub cycle: Cycle,
    /// The operation.
    pub request: Request,
}

/// Outcome of a replay run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    /// Every issued operation, in issue order.
    pub issues: Vec<IssueRecord>,
    /// Cycle at which the last operation finished on the channel.
    pub final_cycle: Cycle,
    /// Cycles the controller spent blocked.
    pub blocked_cycles: Cycle,
    /// Completed blocked periods.
    pub block_episodes: u64,
    /// Cycles in which an arrival was held back by backpressure.
    pub deferred_cycles: Cycle,
}

impl ReplayReport {
    /// Host requests in the issue log.
    pub fn host_issues(&self) -> impl Iterator<Item = &IssueRecord> + '_ {
        self.issues.iter().filter(|r| r.request.command.is_host())
    }
}

/// Bus model used by `replay`.
#[derive(Debug, Clone)]
pub struct ReplayBus {
    timing: DramTiming,
    blocked: bool,
    busy_until: Cycle,
    blocked_cycles: Cycle,
}

impl ReplayBus {
    /// Creates an idle bus over a channel with the given timing.
    pub const fn new(timing: DramTiming) -> Self {
        Self {
            timing,
            blocked: false,
            busy_until: 0,
            blocked_cycles: 0,
        }
    }

    /// Returns `true` while the controller has asserted backpressure.
    pub const fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Returns `true` if the channel can accept an operation at `now`.
    pub const fn is_free(&self, now: Cycle) -> bool {
        now >= self.busy_until
    }

    /// First cycle at which the channel is free again.
    pub const fn busy_until(&self) -> Cycle {
        self.busy_until
    }

    /// Total cycles reported blocked so far.
    pub const fn blocked_cycles(&self) -> Cycle {
        self.blocked_cycles
    }

    /// Executes `op` on the channel starting at `now`.
    pub fn occupy(&mut self, op: &Request, now: Cycle) {
        self.busy_until = now + self.timing.occupancy(op.command);
    }
}

impl BusObserver for ReplayBus {
    fn on_blocked(&mut self, now: Cycle) {
        debug!(now, "bus: admission paused");
        self.blocked = true;
    }

    fn on_unblocked(&mut self, now: Cycle, blocked_cycles: Cycle) {
        debug!(now, blocked_cycles, "bus: admission resumed");
        self.blocked = false;
        self.blocked_cycles += blocked_cycles;
    }
}

/// Replays `trace` through `scheduler` until every request has been issued.
///
/// # Errors
///
/// Any `ControllerError` raised by the controller. All of them abort the run.
pub fn replay(
    scheduler: &mut dyn MemoryScheduler,
    trace: &Trace,
    timing: DramTiming,
) -> Result<ReplayReport, ControllerError> {
    let mut bus = ReplayBus::new(timing);
    let mut report = ReplayReport::default();
    let entries = trace.entries();
    let mut cursor = 0;
    let mut now: Cycle = 0;

    loop {
        while let Some(entry) = entries.get(cursor) {
            if entry.cycle > now {
                break;
            }
            if bus.is_blocked() {
                report.deferred_cycles += 1;
                break;
            }
            scheduler.insert(entry.request(cursor as u64), now, &mut bus)?;
            cursor += 1;
        }

        if bus.is_free(now) && scheduler.has_pending() {
            let op = scheduler.next(now, &mut bus)?;
            bus.occupy(&op, now);
            report.issues.push(IssueRecord {
                cycle: now,
                request: op,
            });
        }

        if scheduler.has_pending() {
            now += 1;
        } else {
            match entries.get(cursor) {
                Some(entry) => now = entry.cycle.max(now + 1),
                None => break,
            }
        }
    }

    report.final_cycle = bus.busy_until().max(now);
    let stats = scheduler.stats();
    report.blocked_cycles = stats.blocked_cycles;
    report.block_episodes = stats.block_episodes;
    info!(
        policy = scheduler.name(),
        issued = report.issues.len(),
        final_cycle = report.final_cycle,
        blocked_cycles = report.blocked_cycles,
        "replay finished"
    );
    Ok(report)
}
