//! Configuration for memory-controller instances.
//!
//! This module defines the construction-time parameters of a controller. It provides:
//! 1. **Defaults:** Baseline watermarks, page-set size, reservation count, and DRAM
//!    geometry/timing.
//! 2. **Structures:** `ControllerConfig` with nested `GeometryConfig` and `TimingConfig`.
//! 3. **Enums:** `PolicyKind`, selecting one of the four scheduling policies.
//! 4. **Validation:** `ControllerConfig::validate` rejects inconsistent parameter sets.
//!
//! Configuration is deserialized from JSON (e.g. by the CLI) or built from
//! `ControllerConfig::default()`.
//! Every value is fixed once the controller is constructed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default configuration constants.
mod defaults {
    /// Pending-request depth above which the controller asserts backpressure.
    pub const HIGH_WATERMARK: usize = 192;

    /// Pending-request depth below which asserted backpressure is released.
    ///
    /// Kept well under `HIGH_WATERMARK` so the blocked signal does not toggle every cycle.
    pub const LOW_WATERMARK: usize = 60;

    /// Concurrently open pages in the multi-bank policy.
    pub const MAX_ACTIVE_PAGES: usize = 4;

    /// Pending writes that trigger a write drain in the multi-bank policy.
    pub const RESERVED_SLOTS: usize = 8;

    /// Address bits below the page number (1 KiB pages).
    pub const PAGE_SHIFT: u32 = 10;

    /// DRAM banks.
    pub const BANKS: usize = 8;

    /// CAS (Column Access Strobe) latency in DRAM cycles.
    pub const T_CAS: u64 = 14;

    /// RAS (Row Access Strobe) latency in DRAM cycles.
    pub const T_RAS: u64 = 14;

    /// Precharge latency in DRAM cycles.
    pub const T_PRE: u64 = 14;
}

/// Scheduling policy implemented by a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PolicyKind {
    /// Single in-order queue; same-page neighbours share one Activate/Close bracket.
    #[default]
    #[serde(alias = "FCFS", alias = "Fcfs")]
    StrictFcfs,
    /// Reads before writes, one open page, drain the open page before switching.
    #[serde(alias = "RDFCFS", alias = "RdFcfs")]
    ReadPriorityFcfs,
    /// Read/write/prewriteback queues over several open pages, with write reservation.
    #[serde(alias = "FCFSRW", alias = "FcfsRw")]
    ReservationFcfs,
    /// One page in service at a time, drained before the next page in arrival order.
    #[serde(alias = "TM")]
    TimeMultiplexed,
}

impl PolicyKind {
    /// All policies, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::StrictFcfs,
        Self::ReadPriorityFcfs,
        Self::ReservationFcfs,
        Self::TimeMultiplexed,
    ];

    /// Short name used in logs and on the command line.
    pub const fn name(self) -> &'static str {
        match self {
            Self::StrictFcfs => "fcfs",
            Self::ReadPriorityFcfs => "rdfcfs",
            Self::ReservationFcfs => "fcfsrw",
            Self::TimeMultiplexed => "tm",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fcfs" | "strict" | "strictfcfs" | "strict-fcfs" => Ok(Self::StrictFcfs),
            "rdfcfs" | "read-priority" | "readpriorityfcfs" => Ok(Self::ReadPriorityFcfs),
            "fcfsrw" | "reservation" | "reservationfcfs" => Ok(Self::ReservationFcfs),
            "tm" | "time-multiplexed" | "timemultiplexed" => Ok(Self::TimeMultiplexed),
            _ => Err(ConfigError::UnknownPolicy(s.to_string())),
        }
    }
}

/// Errors raised by `ControllerConfig::validate` and policy-name parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The low watermark is above the high watermark.
    #[error("low watermark {low} exceeds high watermark {high}")]
    InvertedWatermarks {
        /// Configured low watermark.
        low: usize,
        /// Configured high watermark.
        high: usize,
    },
    /// A low watermark of zero would never release backpressure.
    #[error("low watermark must be at least 1")]
    ZeroLowWatermark,
    /// `max_active_pages` is zero.
    #[error("max_active_pages must be at least 1")]
    NoActivePages,
    /// The geometry has no banks.
    #[error("DRAM geometry must have at least one bank")]
    NoBanks,
    /// The page shift does not fit a 64-bit address.
    #[error("page_shift {0} does not fit a 64-bit address")]
    PageShiftTooLarge(u32),
    /// The hard cap would never be reached before backpressure kicks in.
    #[error("hard cap {cap} must exceed high watermark {high}")]
    HardCapBelowWatermark {
        /// Configured hard cap.
        cap: usize,
        /// Configured high watermark.
        high: usize,
    },
    /// A page quantum of zero would never serve a request.
    #[error("page_quantum must be at least 1")]
    ZeroQuantum,
    /// A policy name did not match any known policy.
    #[error("unknown scheduling policy '{0}'")]
    UnknownPolicy(String),
}

/// DRAM geometry parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Address bits below the page number.
    #[serde(default = "GeometryConfig::default_page_shift")]
    pub page_shift: u32,

    /// Number of DRAM banks.
    #[serde(default = "GeometryConfig::default_banks")]
    pub banks: usize,
}

impl GeometryConfig {
    fn default_page_shift() -> u32 {
        defaults::PAGE_SHIFT
    }

    fn default_banks() -> usize {
        defaults::BANKS
    }
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            page_shift: defaults::PAGE_SHIFT,
            banks: defaults::BANKS,
        }
    }
}

/// DRAM timing parameters used by the replay bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// CAS latency (column access strobe)
    #[serde(default = "TimingConfig::default_t_cas")]
    pub t_cas: u64,

    /// RAS latency (row access strobe)
    #[serde(default = "TimingConfig::default_t_ras")]
    pub t_ras: u64,

    /// Precharge latency
    #[serde(default = "TimingConfig::default_t_pre")]
    pub t_pre: u64,
}

impl TimingConfig {
    /// Returns the default CAS latency in DRAM cycles.
    fn default_t_cas() -> u64 {
        defaults::T_CAS
    }

    /// Returns the default RAS latency in DRAM cycles.
    fn default_t_ras() -> u64 {
        defaults::T_RAS
    }

    /// Returns the default precharge latency in DRAM cycles.
    fn default_t_pre() -> u64 {
        defaults::T_PRE
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            t_cas: defaults::T_CAS,
            t_ras: defaults::T_RAS,
            t_pre: defaults::T_PRE,
        }
    }
}

/// Construction-time parameters of one controller instance.
///
/// # Examples
///
/// ```
/// use memsched_core::config::{ControllerConfig, PolicyKind};
///
/// let json = r#"{
///     "policy": "ReservationFcfs",
///     "high_watermark": 64,
///     "low_watermark": 16,
///     "max_active_pages": 2,
///     "reserved_slots": 4,
///     "geometry": { "page_shift": 12, "banks": 4 }
/// }"#;
///
/// let config: ControllerConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(config.policy, PolicyKind::ReservationFcfs);
/// assert_eq!(config.geometry.page_shift, 12);
/// assert_eq!(config.timing.t_cas, 14);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Scheduling policy
    #[serde(default)]
    pub policy: PolicyKind,

    /// Depth above which backpressure is asserted
    #[serde(default = "ControllerConfig::default_high_watermark")]
    pub high_watermark: usize,

    /// Depth below which backpressure is released
    #[serde(default = "ControllerConfig::default_low_watermark")]
    pub low_watermark: usize,

    /// Concurrently open pages (multi-bank policy only)
    #[serde(default = "ControllerConfig::default_max_active_pages")]
    pub max_active_pages: usize,

    /// Pending writes that force a write drain (multi-bank policy only; 0 disables)
    #[serde(default = "ControllerConfig::default_reserved_slots")]
    pub reserved_slots: usize,

    /// Optional hard admission cap; `None` keeps admission unconditional
    #[serde(default)]
    pub hard_cap: Option<usize>,

    /// Optional per-page access quantum (time-multiplexed policy only)
    #[serde(default)]
    pub page_quantum: Option<u32>,

    /// DRAM geometry
    #[serde(default)]
    pub geometry: GeometryConfig,

    /// DRAM timing
    #[serde(default)]
    pub timing: TimingConfig,
}

impl ControllerConfig {
    fn default_high_watermark() -> usize {
        defaults::HIGH_WATERMARK
    }

    fn default_low_watermark() -> usize {
        defaults::LOW_WATERMARK
    }

    fn default_max_active_pages() -> usize {
        defaults::MAX_ACTIVE_PAGES
    }

    fn default_reserved_slots() -> usize {
        defaults::RESERVED_SLOTS
    }

    /// Default configuration with the given policy.
    pub fn with_policy(policy: PolicyKind) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Checks the parameter set for internal consistency.
    ///
    /// # Errors
    ///
    /// The first `ConfigError` found.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.low_watermark > self.high_watermark {
            return Err(ConfigError::InvertedWatermarks {
                low: self.low_watermark,
                high: self.high_watermark,
            });
        }
        if self.low_watermark == 0 {
            return Err(ConfigError::ZeroLowWatermark);
        }
        if self.max_active_pages == 0 {
            return Err(ConfigError::NoActivePages);
        }
        if self.geometry.banks == 0 {
            return Err(ConfigError::NoBanks);
        }
        if self.geometry.page_shift >= u64::BITS {
            return Err(ConfigError::PageShiftTooLarge(self.geometry.page_shift));
        }
        if let Some(cap) = self.hard_cap
            && cap <= self.high_watermark
        {
            return Err(ConfigError::HardCapBelowWatermark {
                cap,
                high: self.high_watermark,
            });
        }
        if matches!(self.page_quantum, Some(0)) {
            return Err(ConfigError::ZeroQuantum);
        }
        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            high_watermark: defaults::HIGH_WATERMARK,
            low_watermark: defaults::LOW_WATERMARK,
            max_active_pages: defaults::MAX_ACTIVE_PAGES,
            reserved_slots: defaults::RESERVED_SLOTS,
            hard_cap: None,
            page_quantum: None,
            geometry: GeometryConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}
