//! Read-priority first-come first-served controller.
//!
//! Reads and writes wait in separate FIFOs. The head-of-line request is the
//! oldest read if any read is pending, otherwise the oldest write. A single
//! open-page slot models the DRAM row buffer, and each call to `next` takes one
//! step of the following state machine against the head-of-line request:
//!
//! | page slot                  | issued                         |
//! |----------------------------|--------------------------------|
//! | closed                     | `Activate` for the head's page |
//! | open, other page           | `Close` for the open page      |
//! | open, head's page          | the head request itself        |
//!
//! The head is only dequeued in the last case.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;

use crate::common::{Command, ControllerError, Cycle, Handle, Request};
use crate::config::{ControllerConfig, PolicyKind};
use crate::soc::memory::geometry::DramGeometry;
use crate::soc::traits::BusObserver;

use super::MemoryScheduler;
use super::page::OpenPage;
use super::shared::ControllerCore;

/// Read-first controller over one open page.
#[derive(Debug)]
pub struct ReadPriorityFcfs {
    core: ControllerCore,
    reads: VecDeque<Handle>,
    writes: VecDeque<Handle>,
    page: OpenPage,
}

impl ReadPriorityFcfs {
    /// Creates an empty controller with no page open.
    pub fn new(config: &ControllerConfig, geometry: Arc<dyn DramGeometry>) -> Self {
        Self {
            core: ControllerCore::new(config, geometry),
            reads: VecDeque::new(),
            writes: VecDeque::new(),
            page: OpenPage::new(),
        }
    }

    /// The page currently open, if any.
    pub const fn open_page(&self) -> Option<u64> {
        self.page.current()
    }

    /// Pending reads.
    pub fn pending_reads(&self) -> usize {
        self.reads.len()
    }

    /// Pending writes (including writebacks).
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }
}

impl MemoryScheduler for ReadPriorityFcfs {
    fn insert(
        &mut self,
        request: Request,
        now: Cycle,
        bus: &mut dyn BusObserver,
    ) -> Result<(), ControllerError> {
        let (handle, request) = self.core.admit(request, now, bus)?;
        if request.command == Command::Read {
            self.reads.push_back(handle);
        } else {
            self.writes.push_back(handle);
        }
        Ok(())
    }

    fn has_pending(&self) -> bool {
        !self.reads.is_empty() || !self.writes.is_empty()
    }

    fn next(&mut self, now: Cycle, bus: &mut dyn BusObserver) -> Result<Request, ControllerError> {
        let (from_reads, head) = match (self.reads.front(), self.writes.front()) {
            (Some(&h), _) => (true, h),
            (None, Some(&h)) => (false, h),
            (None, None) => return Err(ControllerError::NoPendingRequests),
        };
        let request = *self.core.arena.get(head)?;
        let page = self.core.page_of(request.addr);

        match self.page.current() {
            None => {
                self.page.open(page);
                debug!(page, "open page");
                Ok(self
                    .core
                    .emit(Request::activate(request.id, request.addr, now), now))
            }
            Some(open) if open != page => {
                let _ = self.page.close();
                debug!(page = open, next = page, "close page");
                let addr = self.core.page_base(open);
                Ok(self.core.emit(Request::close(request.id, addr, now), now))
            }
            Some(_) => {
                let queue = if from_reads {
                    &mut self.reads
                } else {
                    &mut self.writes
                };
                let _ = queue.pop_front();
                self.core.retire(head, now, bus)
            }
        }
    }

    fn core(&self) -> &ControllerCore {
        &self.core
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::ReadPriorityFcfs
    }
}
