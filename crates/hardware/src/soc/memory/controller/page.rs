//! Open-page tracking.
//!
//! Controllers decide between "issue now", "activate first", and "close, then
//! activate" by comparing a request's page against what they believe is open:
//! - `OpenPage`: one page slot, for the single-page policies.
//! - `BankTracker`: up to `max_active_pages` open pages, at most one per bank,
//!   for the multi-bank policy.

use super::super::geometry::DramGeometry;

/// Single open-page slot.
///
/// Remembers the last page even after it is closed, so a close can always name
/// the page it precharges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenPage {
    page: u64,
    open: bool,
}

impl OpenPage {
    /// Creates a closed slot.
    pub const fn new() -> Self {
        Self { page: 0, open: false }
    }

    /// Returns `true` if some page is open.
    #[inline]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// The open page, if any.
    #[inline]
    pub const fn current(&self) -> Option<u64> {
        if self.open { Some(self.page) } else { None }
    }

    /// Returns `true` if `page` is the open page.
    #[inline]
    pub const fn is_open_for(&self, page: u64) -> bool {
        self.open && self.page == page
    }

    /// Marks `page` open.
    pub const fn open(&mut self, page: u64) {
        self.page = page;
        self.open = true;
    }

    /// Marks the slot closed and returns the page that was open.
    pub const fn close(&mut self) -> Option<u64> {
        let was = self.current();
        self.open = false;
        was
    }
}

/// One entry of the multi-bank page set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePage {
    /// Page number.
    pub page: u64,
    /// Bank holding the page.
    pub bank: usize,
    /// Activation sequence number; lower is older.
    pub opened_seq: u64,
}

/// Bounded set of concurrently open pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankTracker {
    pages: Vec<ActivePage>,
    capacity: usize,
    next_seq: u64,
}

impl BankTracker {
    /// Creates an empty set that holds at most `capacity` open pages.
    pub const fn new(capacity: usize) -> Self {
        Self {
            pages: Vec::new(),
            capacity,
            next_seq: 0,
        }
    }

    /// Maximum number of concurrently open pages.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of open pages.
    #[inline]
    pub const fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns `true` if no page is open.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Returns `true` if every slot is taken.
    #[inline]
    pub const fn is_full(&self) -> bool {
        self.pages.len() >= self.capacity
    }

    /// Returns `true` if `page` is open.
    pub fn is_open(&self, page: u64) -> bool {
        self.pages.iter().any(|p| p.page == page)
    }

    /// Open page sharing `page`'s bank, other than `page` itself.
    pub fn conflicting(&self, page: u64, geometry: &dyn DramGeometry) -> Option<u64> {
        let bank = geometry.bank_of(page);
        self.pages
            .iter()
            .find(|p| p.bank == bank && p.page != page)
            .map(|p| p.page)
    }

    /// Returns `true` if `page` could be activated now: a slot is free and its bank is idle.
    pub fn can_open(&self, page: u64, geometry: &dyn DramGeometry) -> bool {
        !self.is_full() && !self.is_open(page) && self.conflicting(page, geometry).is_none()
    }

    /// Least recently activated open page.
    pub fn oldest(&self) -> Option<u64> {
        self.pages
            .iter()
            .min_by_key(|p| p.opened_seq)
            .map(|p| p.page)
    }

    /// Open pages, oldest activation first.
    pub fn iter_by_age(&self) -> impl Iterator<Item = &ActivePage> + '_ {
        let mut ordered: Vec<&ActivePage> = self.pages.iter().collect();
        ordered.sort_by_key(|p| p.opened_seq);
        ordered.into_iter()
    }

    /// Marks `page` open.
    ///
    /// # Returns
    ///
    /// `false` (and no change) if the page cannot be opened.
    pub fn open(&mut self, page: u64, geometry: &dyn DramGeometry) -> bool {
        if !self.can_open(page, geometry) {
            return false;
        }
        self.pages.push(ActivePage {
            page,
            bank: geometry.bank_of(page),
            opened_seq: self.next_seq,
        });
        self.next_seq += 1;
        true
    }

    /// Marks `page` closed.
    ///
    /// # Returns
    ///
    /// `false` if the page was not open.
    pub fn close(&mut self, page: u64) -> bool {
        match self.pages.iter().position(|p| p.page == page) {
            Some(pos) => {
                let _ = self.pages.swap_remove(pos);
                true
            }
            None => false,
        }
    }
}
