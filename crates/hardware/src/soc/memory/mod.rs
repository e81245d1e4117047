//! Main-memory subsystem.
//!
//! This module groups everything between the system bus and the DRAM devices. It provides:
//! 1. **Geometry:** Page and bank mapping of physical addresses (`DramGeometry`).
//! 2. **Timing:** Per-operation occupancy of the DRAM channel (`DramTiming`).
//! 3. **Controller:** The scheduling engines that order, split, and pace requests.

/// Scheduling engines and their shared machinery.
pub mod controller;

/// Page/bank address mapping.
pub mod geometry;

/// DRAM operation latencies.
pub mod timing;

pub use controller::{MemoryScheduler, build};
pub use geometry::{DramGeometry, Geometry};
pub use timing::DramTiming;
