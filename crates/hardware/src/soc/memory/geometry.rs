//! DRAM page and bank mapping.
//!
//! A page is identified by the address bits above `page_shift`. Two requests hit the
//! same page iff their page numbers are equal. Consecutive pages are interleaved
//! across banks (`bank = page % banks`).

use crate::config::GeometryConfig;

/// Read-only view of the DRAM organisation.
///
/// Shared between controllers as `Arc<dyn DramGeometry>`; no controller mutates it.
pub trait DramGeometry: Send + Sync + std::fmt::Debug {
    /// Address bits below the page number.
    fn page_shift(&self) -> u32;

    /// Number of banks.
    fn bank_count(&self) -> usize;

    /// Page number containing `addr`.
    #[inline]
    fn page_of(&self, addr: u64) -> u64 {
        addr >> self.page_shift()
    }

    /// First address of `page`.
    #[inline]
    fn page_base(&self, page: u64) -> u64 {
        page << self.page_shift()
    }

    /// Bank holding `page`.
    #[inline]
    fn bank_of(&self, page: u64) -> usize {
        (page % self.bank_count().max(1) as u64) as usize
    }
}

/// Fixed geometry built from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    page_shift: u32,
    banks: usize,
}

impl Geometry {
    /// Creates a geometry with `2^page_shift`-byte pages spread over `banks` banks.
    pub const fn new(page_shift: u32, banks: usize) -> Self {
        Self { page_shift, banks }
    }
}

impl From<GeometryConfig> for Geometry {
    fn from(config: GeometryConfig) -> Self {
        Self::new(config.page_shift, config.banks)
    }
}

impl Default for Geometry {
    fn default() -> Self {
        GeometryConfig::default().into()
    }
}

impl DramGeometry for Geometry {
    fn page_shift(&self) -> u32 {
        self.page_shift
    }

    fn bank_count(&self) -> usize {
        self.banks
    }
}
