//! DRAM operation latencies.
//!
//! The controllers decide *what* to issue; this model decides how long the
//! channel stays busy afterwards. Each issued operation occupies the channel for:
//! - `Activate`: tRAS (row access strobe)
//! - `Close`: tPRE (precharge)
//! - any host access: tCAS (column access strobe)

use crate::common::{Command, Cycle};
use crate::config::TimingConfig;

/// Channel occupancy per DRAM operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DramTiming {
    t_cas: Cycle,
    t_ras: Cycle,
    t_pre: Cycle,
}

impl DramTiming {
    /// Creates a timing model with the given parameters (in cycles).
    ///
    /// # Arguments
    ///
    /// * `t_cas` - Column access strobe latency.
    /// * `t_ras` - Row access strobe latency.
    /// * `t_pre` - Precharge latency.
    pub const fn new(t_cas: Cycle, t_ras: Cycle, t_pre: Cycle) -> Self {
        Self {
            t_cas,
            t_ras,
            t_pre,
        }
    }

    /// Cycles the channel is busy after issuing `command`.
    ///
    /// Never less than one, so an all-zero configuration still advances time.
    pub fn occupancy(&self, command: Command) -> Cycle {
        let cycles = match command {
            Command::Activate => self.t_ras,
            Command::Close => self.t_pre,
            Command::Read | Command::Write | Command::Prewrite | Command::Writeback => self.t_cas,
        };
        cycles.max(1)
    }
}

impl From<TimingConfig> for DramTiming {
    fn from(config: TimingConfig) -> Self {
        Self::new(config.t_cas, config.t_ras, config.t_pre)
    }
}

impl Default for DramTiming {
    fn default() -> Self {
        TimingConfig::default().into()
    }
}
