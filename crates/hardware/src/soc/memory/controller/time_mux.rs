//! Time-multiplexed (page-quantum) controller.
//!
//! One page is in service at a time. While it is open, only requests that
//! target it are drained from the admission queue, oldest first. When none are
//! left the page is closed and the page of the oldest remaining request is
//! activated next.
//!
//! An optional `page_quantum` bounds how many accesses one page may serve per
//! activation while other pages are waiting. A page whose quantum ran out is
//! passed over for the following activation so a steady stream to one page
//! cannot starve the rest.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;

use crate::common::{ControllerError, Cycle, Handle, Request};
use crate::config::{ControllerConfig, PolicyKind};
use crate::soc::memory::geometry::DramGeometry;
use crate::soc::traits::BusObserver;

use super::MemoryScheduler;
use super::page::OpenPage;
use super::shared::ControllerCore;

#[derive(Debug, Clone, Copy)]
struct Queued {
    handle: Handle,
    page: u64,
    id: u64,
    addr: u64,
}

/// Page-at-a-time controller.
#[derive(Debug)]
pub struct TimeMultiplexed {
    core: ControllerCore,
    queue: VecDeque<Queued>,
    page: OpenPage,
    quantum: Option<usize>,
    served: usize,
    skip: Option<u64>,
}

impl TimeMultiplexed {
    /// Creates an empty controller with no page in service.
    pub fn new(config: &ControllerConfig, geometry: Arc<dyn DramGeometry>) -> Self {
        Self {
            core: ControllerCore::new(config, geometry),
            queue: VecDeque::new(),
            page: OpenPage::new(),
            quantum: config.page_quantum.map(|q| q as usize),
            served: 0,
            skip: None,
        }
    }

    /// The page in service, if any.
    pub const fn open_page(&self) -> Option<u64> {
        self.page.current()
    }

    /// Accesses served by the current page since it was activated.
    pub const fn served(&self) -> usize {
        self.served
    }

    fn quantum_spent(&self) -> bool {
        self.quantum.is_some_and(|q| self.served >= q)
    }

    fn serve_open(
        &mut self,
        open: u64,
        now: Cycle,
        bus: &mut dyn BusObserver,
    ) -> Result<Request, ControllerError> {
        let hit = self.queue.iter().position(|q| q.page == open);
        let others_waiting = self.queue.iter().any(|q| q.page != open);
        let expired = self.quantum_spent() && others_waiting;

        if let Some(pos) = hit.filter(|_| !expired) {
            let entry = self
                .queue
                .remove(pos)
                .ok_or(ControllerError::CorruptQueue("page hit vanished from queue"))?;
            self.served += 1;
            return self.core.retire(entry.handle, now, bus);
        }

        let _ = self.page.close();
        if expired {
            debug!(page = open, served = self.served, "page quantum expired");
            self.skip = Some(open);
        } else {
            debug!(page = open, served = self.served, "page drained");
        }
        self.served = 0;
        let cause = self.queue.front().map_or(0, |q| q.id);
        let addr = self.core.page_base(open);
        Ok(self.core.emit(Request::close(cause, addr, now), now))
    }

    fn activate_next(&mut self, now: Cycle) -> Result<Request, ControllerError> {
        let skip = self.skip.take();
        let next = self
            .queue
            .iter()
            .find(|q| Some(q.page) != skip)
            .or_else(|| self.queue.front())
            .copied()
            .ok_or(ControllerError::NoPendingRequests)?;
        self.page.open(next.page);
        debug!(page = next.page, "page in service");
        Ok(self
            .core
            .emit(Request::activate(next.id, next.addr, now), now))
    }
}

impl MemoryScheduler for TimeMultiplexed {
    fn insert(
        &mut self,
        request: Request,
        now: Cycle,
        bus: &mut dyn BusObserver,
    ) -> Result<(), ControllerError> {
        let (handle, request) = self.core.admit(request, now, bus)?;
        self.queue.push_back(Queued {
            handle,
            page: self.core.page_of(request.addr),
            id: request.id,
            addr: request.addr,
        });
        Ok(())
    }

    fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    fn next(&mut self, now: Cycle, bus: &mut dyn BusObserver) -> Result<Request, ControllerError> {
        if self.queue.is_empty() {
            return Err(ControllerError::NoPendingRequests);
        }
        match self.page.current() {
            Some(open) => self.serve_open(open, now, bus),
            None => self.activate_next(now),
        }
    }

    fn core(&self) -> &ControllerCore {
        &self.core
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::TimeMultiplexed
    }
}
