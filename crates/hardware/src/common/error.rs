//! Controller error definitions.
//!
//! Two families of error share one enum:
//! 1. **Contract violations:** The caller or the controller itself broke an
//!    invariant (`next` on an empty controller, an out-of-state backpressure
//!    transition, a protocol command submitted by the host, a corrupt queue).
//!    These are fatal for the simulation run; the caller must stop rather than retry.
//! 2. **Capacity:** `Overflow` is returned only when a hard admission cap is
//!    configured. Ordinary queue pressure is signalled through backpressure, not errors.

use thiserror::Error;

use super::arena::Handle;
use super::request::Command;

/// Errors reported by `MemoryScheduler` implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// `next` was called while `has_pending` was false.
    #[error("next() called with no pending requests")]
    NoPendingRequests,

    /// `set_blocked` was called while already blocked.
    #[error("controller is already blocked")]
    AlreadyBlocked,

    /// `set_unblocked` was called while not blocked.
    #[error("controller is not blocked")]
    NotBlocked,

    /// A command reached a policy that does not accept it (e.g. a host-submitted `Activate`).
    #[error("unexpected {0} command submitted to controller")]
    UnexpectedCommand(Command),

    /// Admission rejected because the configured hard cap is reached.
    #[error("queue overflow: depth {depth} reached hard cap {cap}")]
    Overflow {
        /// Pending host requests at the time of rejection.
        depth: usize,
        /// Configured hard cap.
        cap: usize,
    },

    /// An internal queue invariant was found broken.
    #[error("corrupt controller queue: {0}")]
    CorruptQueue(&'static str),

    /// A queue referenced an arena slot that was already freed.
    #[error("stale request handle {0}")]
    StaleHandle(Handle),
}

impl ControllerError {
    /// Returns `true` for errors that indicate a logic bug and must end the run.
    ///
    /// Only `Overflow` is recoverable; the bus may retry admission later.
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Overflow { .. })
    }
}
