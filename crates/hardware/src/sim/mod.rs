//! Trace-driven simulation.
//!
//! Loads request traces and replays them cycle by cycle through a memory
//! controller, standing in for the system bus.

/// Trace file format and loading.
pub mod loader;

/// Replay bus and driver loop.
pub mod simulator;

pub use loader::{Trace, TraceEntry, TraceError};
pub use simulator::{IssueRecord, ReplayBus, ReplayReport, replay};
