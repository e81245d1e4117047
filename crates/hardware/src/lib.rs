//! DRAM memory-controller scheduling library.
//!
//! This crate implements the scheduling engines that sit between a simulated
//! system bus and a DRAM channel:
//! 1. **Policies:** Strict FCFS, read-priority FCFS, reservation-aware multi-bank
//!    FCFS, and time-multiplexed.
//! 2. **Backpressure:** High/low watermark blocking with hysteresis and stall accounting.
//! 3. **Page tracking:** Single open-page slot and bounded multi-bank open-page sets.
//! 4. **Simulation:** Trace loading and a cycle-stepped replay bus.
//! 5. **Statistics:** Per-class waits, bursts, page hits, and blocked time.

/// Common types (requests, commands, handles, errors).
pub mod common;
/// Controller configuration (policy selection, watermarks, geometry, timing).
pub mod config;
/// Trace loading and replay.
pub mod sim;
/// Memory controllers, DRAM models, and bus traits.
pub mod soc;
/// Controller statistics collection and reporting.
pub mod stats;

/// Controller configuration; use `ControllerConfig::default()` or deserialize from JSON.
pub use crate::config::{ControllerConfig, PolicyKind};
/// Builds a boxed controller from a configuration.
pub use crate::soc::memory::{MemoryScheduler, build};
