//! Memory-controller scheduling engines.
//!
//! Every engine sits between the bus and the DRAM and implements the same
//! three-operation contract, driven once per simulated cycle by the bus:
//! 1. **`insert`:** Admit one host request; may synthesize Activate/Close companions.
//! 2. **`has_pending`:** Whether any internal queue holds work.
//! 3. **`next`:** Remove and return the next DRAM operation to issue.
//!
//! Four policies are provided:
//! - `StrictFcfs`: one in-order queue with same-page coalescing.
//! - `ReadPriorityFcfs`: reads ahead of writes over a single open page.
//! - `ReservationFcfs`: multi-bank page-hit scheduling with write reservation.
//! - `TimeMultiplexed`: one page in service at a time.
//!
//! The controller runs on the simulation thread only; `now` and the bus
//! callback are passed into each call rather than read from global state.

/// Hysteretic backpressure monitor.
pub mod backpressure;

/// Strict first-come first-served policy.
pub mod fcfs;

/// Open-page trackers.
pub mod page;

/// Read-priority first-come first-served policy.
pub mod rdfcfs;

/// Multi-bank read/write policy with write reservation.
pub mod reservation;

/// Shared admission, storage, and accounting state.
pub mod shared;

/// Page-quantum policy.
pub mod time_mux;

use std::fmt;
use std::sync::Arc;

use crate::common::{ControllerError, Cycle, Request};
use crate::config::{ConfigError, ControllerConfig, PolicyKind};
use crate::soc::memory::geometry::{DramGeometry, Geometry};
use crate::soc::traits::BusObserver;
use crate::stats::ControllerStats;

pub use self::backpressure::Backpressure;
pub use self::fcfs::StrictFcfs;
pub use self::page::{BankTracker, OpenPage};
pub use self::rdfcfs::ReadPriorityFcfs;
pub use self::reservation::ReservationFcfs;
pub use self::shared::ControllerCore;
pub use self::time_mux::TimeMultiplexed;

/// Contract between the bus and a memory controller.
///
/// The bus calls `insert` for each arriving request, then each cycle checks
/// `has_pending` and, if true, calls `next` and executes the returned operation.
pub trait MemoryScheduler: Send + fmt::Debug {
    /// Admits one host request at cycle `now`.
    ///
    /// `Prewrite` is rewritten to `Writeback`. May assert backpressure through `bus`.
    ///
    /// # Errors
    ///
    /// `UnexpectedCommand` for `Activate`/`Close`; `Overflow` only when a hard cap is configured.
    fn insert(
        &mut self,
        request: Request,
        now: Cycle,
        bus: &mut dyn BusObserver,
    ) -> Result<(), ControllerError>;

    /// Returns `true` iff some internal queue is non-empty.
    fn has_pending(&self) -> bool;

    /// Removes and returns the next operation to issue at cycle `now`.
    ///
    /// The result may be a synthesized `Activate`/`Close` rather than a host
    /// request. It is an owned copy and remains valid after later calls. May
    /// release backpressure through `bus`.
    ///
    /// # Errors
    ///
    /// `NoPendingRequests` when `has_pending` is false. This is a contract violation.
    fn next(&mut self, now: Cycle, bus: &mut dyn BusObserver) -> Result<Request, ControllerError>;

    /// Shared controller state.
    fn core(&self) -> &ControllerCore;

    /// Policy implemented by this controller.
    fn kind(&self) -> PolicyKind;

    /// Short policy name, as accepted on the command line.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Returns `true` while backpressure is asserted.
    fn is_blocked(&self) -> bool {
        self.core().backpressure.is_blocked()
    }

    /// Host requests admitted and not yet issued.
    fn depth(&self) -> usize {
        self.core().depth()
    }

    /// Snapshot of the instrumentation counters.
    fn stats(&self) -> ControllerStats {
        self.core().snapshot()
    }
}

/// Builds the controller selected by `config.policy` with the configured geometry.
///
/// # Errors
///
/// Any `ConfigError` from `ControllerConfig::validate`.
pub fn build(config: &ControllerConfig) -> Result<Box<dyn MemoryScheduler>, ConfigError> {
    build_with_geometry(config, Arc::new(Geometry::from(config.geometry)))
}

/// Builds the controller selected by `config.policy` over a caller-supplied geometry model.
///
/// # Errors
///
/// Any `ConfigError` from `ControllerConfig::validate`.
pub fn build_with_geometry(
    config: &ControllerConfig,
    geometry: Arc<dyn DramGeometry>,
) -> Result<Box<dyn MemoryScheduler>, ConfigError> {
    config.validate()?;
    let scheduler: Box<dyn MemoryScheduler> = match config.policy {
        PolicyKind::StrictFcfs => Box::new(StrictFcfs::new(config, geometry)),
        PolicyKind::ReadPriorityFcfs => Box::new(ReadPriorityFcfs::new(config, geometry)),
        PolicyKind::ReservationFcfs => Box::new(ReservationFcfs::new(config, geometry)),
        PolicyKind::TimeMultiplexed => Box::new(TimeMultiplexed::new(config, geometry)),
    };
    Ok(scheduler)
}
