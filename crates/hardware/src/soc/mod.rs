//! System-side components around the DRAM.
//!
//! This module organizes the memory controllers, the DRAM models they consult,
//! and the bus callback trait they report backpressure through.

/// Memory controllers and DRAM models.
pub mod memory;

/// Bus callback trait definitions.
pub mod traits;
