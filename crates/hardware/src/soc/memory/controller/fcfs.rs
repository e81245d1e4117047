//! Strict first-come first-served controller.
//!
//! One FIFO of ready-to-issue operations. Every admitted request is bracketed
//! by an `Activate` and a `Close` for its page. The queue therefore always ends
//! in a `Close`; when a new request targets the same page as that trailing
//! `Close`, the request slides in front of it instead of opening a second
//! bracket:
//!
//! ```text
//! [.., Close(p)] + R(p)  =>  [.., R(p), Close(p)]
//! [.., Close(p)] + R(q)  =>  [.., Close(p), Activate(q), R(q), Close(q)]
//! ```
//!
//! Requests are never reordered across pages.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::common::{Command, ControllerError, Cycle, Handle, Request};
use crate::config::{ControllerConfig, PolicyKind};
use crate::soc::memory::geometry::DramGeometry;
use crate::soc::traits::BusObserver;

use super::MemoryScheduler;
use super::shared::ControllerCore;

/// In-order controller with same-page coalescing.
#[derive(Debug)]
pub struct StrictFcfs {
    core: ControllerCore,
    queue: VecDeque<Handle>,
}

impl StrictFcfs {
    /// Creates an empty controller.
    pub fn new(config: &ControllerConfig, geometry: Arc<dyn DramGeometry>) -> Self {
        Self {
            core: ControllerCore::new(config, geometry),
            queue: VecDeque::new(),
        }
    }

    /// Operations queued, synthesized ones included.
    pub fn queued_ops(&self) -> usize {
        self.queue.len()
    }

    /// Handle of the trailing `Close` if it closes `page`.
    ///
    /// # Errors
    ///
    /// `CorruptQueue` if the queue is non-empty and does not end in a `Close`.
    fn coalescing_close(&self, page: u64) -> Result<Option<Handle>, ControllerError> {
        let Some(&tail) = self.queue.back() else {
            return Ok(None);
        };
        let close = self.core.arena.get(tail)?;
        if close.command != Command::Close {
            return Err(ControllerError::CorruptQueue(
                "strict FCFS queue does not end in a Close",
            ));
        }
        if self.core.page_of(close.addr) == page {
            Ok(Some(tail))
        } else {
            Ok(None)
        }
    }
}

impl MemoryScheduler for StrictFcfs {
    fn insert(
        &mut self,
        request: Request,
        now: Cycle,
        bus: &mut dyn BusObserver,
    ) -> Result<(), ControllerError> {
        let page = self.core.page_of(request.addr);
        let tail_close = self.coalescing_close(page)?;

        let (handle, request) = self.core.admit(request, now, bus)?;
        if let Some(close) = tail_close {
            let _ = self.queue.pop_back();
            self.queue.push_back(handle);
            self.queue.push_back(close);
            return Ok(());
        }

        let activate = self.core.synthesize(Request::activate(request.id, request.addr, now));
        let close = self.core.synthesize(Request::close(request.id, request.addr, now));
        self.queue.extend([activate, handle, close]);
        Ok(())
    }

    fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    fn next(&mut self, now: Cycle, bus: &mut dyn BusObserver) -> Result<Request, ControllerError> {
        let handle = self
            .queue
            .pop_front()
            .ok_or(ControllerError::NoPendingRequests)?;
        self.core.retire(handle, now, bus)
    }

    fn core(&self) -> &ControllerCore {
        &self.core
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::StrictFcfs
    }
}
