//! Multi-bank read/write controller with write reservation.
//!
//! Requests wait in three FIFOs: reads, writes, and prewritebacks (writebacks
//! and normalized prewrites). Up to `max_active_pages` pages may be open at
//! once, at most one per bank.
//!
//! # Preferred set
//!
//! Reads normally go first. `reserved_slots` (K) bounds how long writes can be
//! held back: once K write-class requests are pending, the controller enters a
//! write drain and prefers writes. A drain ends after K write-class issues or
//! when both write queues are empty, whichever comes first. If reads were
//! waiting when it ended, the next drain cannot start until one of them has
//! been issued, so a continuous write stream cannot starve reads either.
//! With `reserved_slots == 0` there is no drain and writes are preferred only
//! when no read is pending.
//!
//! # Selection
//!
//! Each call to `next` evaluates, in order, and takes the first that applies:
//! 1. **Activate:** the oldest preferred request whose page is closed and can be
//!    opened (free slot, idle bank).
//! 2. **Close:** the least recently activated open page that no pending
//!    request targets.
//! 3. **Page hit:** the oldest preferred request whose page is open.
//! 4. **Fallback:** the oldest pending request of any class. Issue it if its
//!    page is open, else activate its page if possible, else close the page
//!    occupying its bank (or the oldest open page).
//!
//! Ties always break by arrival order.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;

use crate::common::{Command, ControllerError, Cycle, Handle, Request};
use crate::config::{ControllerConfig, PolicyKind};
use crate::soc::memory::geometry::DramGeometry;
use crate::soc::traits::BusObserver;

use super::MemoryScheduler;
use super::page::BankTracker;
use super::shared::ControllerCore;

/// Internal queue identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lane {
    Read,
    Write,
    Writeback,
}

const ALL_LANES: [Lane; 3] = [Lane::Read, Lane::Write, Lane::Writeback];
const READ_LANES: [Lane; 1] = [Lane::Read];
const WRITE_LANES: [Lane; 2] = [Lane::Write, Lane::Writeback];

/// Queue entry; caches the fields selection looks at.
#[derive(Debug, Clone, Copy)]
struct Pending {
    handle: Handle,
    seq: u64,
    page: u64,
    id: u64,
    addr: u64,
}

/// A pending request located in its queue.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    lane: Lane,
    pos: usize,
    entry: Pending,
}

/// Page-hit-first controller over several open pages.
#[derive(Debug)]
pub struct ReservationFcfs {
    core: ControllerCore,
    reads: VecDeque<Pending>,
    writes: VecDeque<Pending>,
    writebacks: VecDeque<Pending>,
    pages: BankTracker,
    reserved_slots: usize,
    draining: bool,
    drained: usize,
    read_owed: bool,
    next_seq: u64,
}

impl ReservationFcfs {
    /// Creates an empty controller with every page closed.
    pub fn new(config: &ControllerConfig, geometry: Arc<dyn DramGeometry>) -> Self {
        Self {
            core: ControllerCore::new(config, geometry),
            reads: VecDeque::new(),
            writes: VecDeque::new(),
            writebacks: VecDeque::new(),
            pages: BankTracker::new(config.max_active_pages),
            reserved_slots: config.reserved_slots,
            draining: false,
            drained: 0,
            read_owed: false,
            next_seq: 0,
        }
    }

    /// Pending reads.
    pub fn pending_reads(&self) -> usize {
        self.reads.len()
    }

    /// Pending writes and writebacks.
    pub fn pending_writes(&self) -> usize {
        self.writes.len() + self.writebacks.len()
    }

    /// Returns `true` while a write drain is in progress.
    pub const fn is_draining(&self) -> bool {
        self.draining
    }

    /// Open-page set.
    pub const fn open_pages(&self) -> &BankTracker {
        &self.pages
    }

    const fn lane(&self, lane: Lane) -> &VecDeque<Pending> {
        match lane {
            Lane::Read => &self.reads,
            Lane::Write => &self.writes,
            Lane::Writeback => &self.writebacks,
        }
    }

    const fn lane_mut(&mut self, lane: Lane) -> &mut VecDeque<Pending> {
        match lane {
            Lane::Read => &mut self.reads,
            Lane::Write => &mut self.writes,
            Lane::Writeback => &mut self.writebacks,
        }
    }

    fn preferred(&self) -> &'static [Lane] {
        if self.draining || self.reads.is_empty() {
            &WRITE_LANES
        } else {
            &READ_LANES
        }
    }

    /// Pending requests in `lanes`, oldest first.
    fn candidates(&self, lanes: &[Lane]) -> Vec<Candidate> {
        let mut out: Vec<Candidate> = lanes
            .iter()
            .flat_map(|&lane| {
                self.lane(lane)
                    .iter()
                    .enumerate()
                    .map(move |(pos, &entry)| Candidate { lane, pos, entry })
            })
            .collect();
        out.sort_by_key(|c| c.entry.seq);
        out
    }

    /// Returns `true` if any pending request targets `page`.
    fn targeted(&self, page: u64) -> bool {
        ALL_LANES
            .iter()
            .any(|&lane| self.lane(lane).iter().any(|p| p.page == page))
    }

    /// Advances the drain state after an insert (`issued == None`) or an issue from `issued`.
    fn update_drain(&mut self, issued: Option<Lane>) {
        match issued {
            Some(Lane::Read) => self.read_owed = false,
            Some(_) if self.draining => self.drained += 1,
            _ => {}
        }
        let pending = self.pending_writes();
        if self.draining {
            if pending == 0 || self.drained >= self.reserved_slots {
                self.draining = false;
                self.read_owed = !self.reads.is_empty();
                debug!(issued = self.drained, pending, "write drain finished");
            }
        } else if self.reserved_slots > 0 && pending >= self.reserved_slots && !self.read_owed {
            self.draining = true;
            self.drained = 0;
            debug!(pending, reserved = self.reserved_slots, "write drain started");
        }
    }

    fn activate(&mut self, cause: Candidate, now: Cycle) -> Result<Request, ControllerError> {
        let page = cause.entry.page;
        if !self.pages.open(page, self.core.geometry.as_ref()) {
            return Err(ControllerError::CorruptQueue(
                "activate for a page that cannot open",
            ));
        }
        debug!(page, open = self.pages.len(), "open page");
        Ok(self
            .core
            .emit(Request::activate(cause.entry.id, cause.entry.addr, now), now))
    }

    fn close(&mut self, page: u64, cause: u64, now: Cycle) -> Request {
        let _ = self.pages.close(page);
        debug!(page, open = self.pages.len(), "close page");
        let addr = self.core.page_base(page);
        self.core.emit(Request::close(cause, addr, now), now)
    }

    fn issue(
        &mut self,
        chosen: Candidate,
        now: Cycle,
        bus: &mut dyn BusObserver,
    ) -> Result<Request, ControllerError> {
        let removed = self.lane_mut(chosen.lane).remove(chosen.pos);
        if removed.map(|p| p.handle) != Some(chosen.entry.handle) {
            return Err(ControllerError::CorruptQueue("candidate position out of date"));
        }
        let request = self.core.retire(chosen.entry.handle, now, bus)?;
        self.update_drain(Some(chosen.lane));
        Ok(request)
    }

    /// Predicate 4: progress on the oldest pending request regardless of class.
    fn fallback(
        &mut self,
        now: Cycle,
        bus: &mut dyn BusObserver,
    ) -> Result<Request, ControllerError> {
        let oldest = self
            .candidates(&ALL_LANES)
            .first()
            .copied()
            .ok_or(ControllerError::NoPendingRequests)?;
        let page = oldest.entry.page;
        if self.pages.is_open(page) {
            return self.issue(oldest, now, bus);
        }
        let geometry = Arc::clone(&self.core.geometry);
        if self.pages.can_open(page, geometry.as_ref()) {
            return self.activate(oldest, now);
        }
        let victim = self
            .pages
            .conflicting(page, geometry.as_ref())
            .or_else(|| self.pages.oldest())
            .ok_or(ControllerError::CorruptQueue("no open page to make room"))?;
        Ok(self.close(victim, oldest.entry.id, now))
    }
}

impl MemoryScheduler for ReservationFcfs {
    fn insert(
        &mut self,
        request: Request,
        now: Cycle,
        bus: &mut dyn BusObserver,
    ) -> Result<(), ControllerError> {
        let (handle, request) = self.core.admit(request, now, bus)?;
        let entry = Pending {
            handle,
            seq: self.next_seq,
            page: self.core.page_of(request.addr),
            id: request.id,
            addr: request.addr,
        };
        self.next_seq += 1;
        let lane = match request.command {
            Command::Read => Lane::Read,
            Command::Write => Lane::Write,
            _ => Lane::Writeback,
        };
        self.lane_mut(lane).push_back(entry);
        self.update_drain(None);
        Ok(())
    }

    fn has_pending(&self) -> bool {
        !self.reads.is_empty() || !self.writes.is_empty() || !self.writebacks.is_empty()
    }

    fn next(&mut self, now: Cycle, bus: &mut dyn BusObserver) -> Result<Request, ControllerError> {
        if !self.has_pending() {
            return Err(ControllerError::NoPendingRequests);
        }
        let geometry = Arc::clone(&self.core.geometry);
        let preferred = self.candidates(self.preferred());

        if let Some(&c) = preferred
            .iter()
            .find(|c| self.pages.can_open(c.entry.page, geometry.as_ref()))
        {
            return self.activate(c, now);
        }

        let idle = self
            .pages
            .iter_by_age()
            .map(|p| p.page)
            .find(|&page| !self.targeted(page));
        if let Some(page) = idle {
            let cause = preferred.first().map_or(0, |c| c.entry.id);
            return Ok(self.close(page, cause, now));
        }

        if let Some(&c) = preferred.iter().find(|c| self.pages.is_open(c.entry.page)) {
            return self.issue(c, now, bus);
        }

        self.fallback(now, bus)
    }

    fn core(&self) -> &ControllerCore {
        &self.core
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::ReservationFcfs
    }
}
