//! Common types used throughout the memory-controller scheduling engines.
//!
//! This module provides the building blocks shared by every scheduling policy:
//! 1. **Requests:** The `Request` value type, its `Command` kind, and instrumentation classes.
//! 2. **Arena:** A slab of `Request` values addressed by generation-checked `Handle`s.
//! 3. **Error Handling:** Contract-violation and capacity errors reported by controllers.

/// Generation-checked request slab.
pub mod arena;

/// Error types reported by controllers.
pub mod error;

/// Request and command definitions.
pub mod request;

pub use arena::{Handle, RequestArena};
pub use error::ControllerError;
pub use request::{Command, Request, RequestClass};

/// Simulated time, in controller clock cycles.
pub type Cycle = u64;
