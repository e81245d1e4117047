//! State shared by every scheduling policy.
//!
//! Policies differ only in queue discipline. Admission checks, Prewrite
//! normalization, request storage, depth accounting, backpressure, and
//! statistics live here and are composed into each policy.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::common::{ControllerError, Cycle, Handle, Request, RequestArena};
use crate::config::ControllerConfig;
use crate::soc::memory::geometry::DramGeometry;
use crate::soc::traits::BusObserver;
use crate::stats::ControllerStats;

use super::backpressure::Backpressure;

/// Upper bound on the arena slots reserved up front; the arena grows past it on demand.
const ARENA_PREALLOC: usize = 4096;

/// Composed controller state.
#[derive(Debug)]
pub struct ControllerCore {
    /// Storage for queued requests, host and synthesized.
    pub arena: RequestArena,
    /// High/low watermark monitor.
    pub backpressure: Backpressure,
    /// Shared DRAM organisation.
    pub geometry: Arc<dyn DramGeometry>,
    /// Instrumentation. Blocked-time fields stay zero here; see `snapshot`.
    pub stats: ControllerStats,
    depth: usize,
    hard_cap: Option<usize>,
}

impl ControllerCore {
    /// Creates the shared state for one controller.
    pub fn new(config: &ControllerConfig, geometry: Arc<dyn DramGeometry>) -> Self {
        Self {
            arena: RequestArena::with_capacity(
                config.high_watermark.saturating_mul(3).min(ARENA_PREALLOC),
            ),
            backpressure: Backpressure::new(config.high_watermark, config.low_watermark),
            geometry,
            stats: ControllerStats::default(),
            depth: 0,
            hard_cap: config.hard_cap,
        }
    }

    /// Host requests admitted and not yet issued.
    #[inline]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Page number of `addr`.
    #[inline]
    pub fn page_of(&self, addr: u64) -> u64 {
        self.geometry.page_of(addr)
    }

    /// First address of `page`.
    #[inline]
    pub fn page_base(&self, page: u64) -> u64 {
        self.geometry.page_base(page)
    }

    /// Checks that `request` may be admitted, without changing any state.
    ///
    /// # Errors
    ///
    /// `UnexpectedCommand` for protocol commands; `Overflow` when the hard cap is reached.
    pub fn check_admission(&self, request: &Request) -> Result<(), ControllerError> {
        if request.command.is_protocol() {
            return Err(ControllerError::UnexpectedCommand(request.command));
        }
        match self.hard_cap {
            Some(cap) if self.depth >= cap => Err(ControllerError::Overflow {
                depth: self.depth,
                cap,
            }),
            _ => Ok(()),
        }
    }

    /// Admits a host request: normalizes it, stores it, and applies the high watermark.
    ///
    /// # Returns
    ///
    /// The arena handle and the normalized request.
    ///
    /// # Errors
    ///
    /// Admission errors from `check_admission` (counted as rejections), or a
    /// backpressure state error.
    pub fn admit(
        &mut self,
        mut request: Request,
        now: Cycle,
        bus: &mut dyn BusObserver,
    ) -> Result<(Handle, Request), ControllerError> {
        if let Err(err) = self.check_admission(&request) {
            if matches!(err, ControllerError::Overflow { .. }) {
                self.stats.record_reject();
                warn!(
                    id = request.id,
                    addr = request.addr,
                    depth = self.depth,
                    "admission refused"
                );
            }
            return Err(err);
        }
        request.normalize();
        request.inserted_at = now;
        request.satisfied = false;
        let handle = self.arena.alloc(request);
        self.depth += 1;
        self.stats.record_admit();
        trace!(%request, depth = self.depth, "admitted");
        let _ = self.backpressure.after_insert(self.depth, now, bus)?;
        Ok((handle, request))
    }

    /// Stores a synthesized protocol request and returns its handle.
    pub fn synthesize(&mut self, request: Request) -> Handle {
        self.arena.alloc(request)
    }

    /// Removes a queued request from the arena and hands it to the bus.
    ///
    /// Host requests lower the depth and may release backpressure.
    ///
    /// # Errors
    ///
    /// `StaleHandle` if the handle is no longer live, or a backpressure state error.
    pub fn retire(
        &mut self,
        handle: Handle,
        now: Cycle,
        bus: &mut dyn BusObserver,
    ) -> Result<Request, ControllerError> {
        let request = self.arena.remove(handle)?;
        if request.is_synthesized() {
            return Ok(self.emit(request, now));
        }
        self.depth -= 1;
        let _ = self.backpressure.after_issue(self.depth, now, bus)?;
        self.stats.record_issue(&request, now);
        trace!(now, %request, depth = self.depth, "issue");
        Ok(request)
    }

    /// Statistics with the blocked-time totals taken from the backpressure monitor.
    pub const fn snapshot(&self) -> ControllerStats {
        self.stats.with_blocked(
            self.backpressure.episodes(),
            self.backpressure.total_blocked(),
        )
    }

    /// Hands a synthesized request, never queued, straight to the bus.
    pub fn emit(&mut self, request: Request, now: Cycle) -> Request {
        self.stats.record_issue(&request, now);
        trace!(now, %request, "issue");
        request
    }
}
