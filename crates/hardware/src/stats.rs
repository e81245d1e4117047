//! Controller statistics collection and reporting.
//!
//! This module tracks what a controller did, not how it decided. It provides:
//! 1. **Traffic:** Host requests admitted, issued, and rejected.
//! 2. **Protocol overhead:** Synthesized activates and closes, and the resulting page-hit count.
//! 3. **Backpressure:** Blocked episodes and total blocked cycles.
//! 4. **Per-class instrumentation:** Issue counts, wait time, and burst sizes for
//!    reads, writes, and prewrites.
//!
//! None of these values feed back into scheduling decisions.

use crate::common::{Command, Cycle, Request, RequestClass};

/// Instrumentation for one traffic class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassStats {
    /// Requests of this class issued to the bus.
    pub issued: u64,
    /// Sum over issued requests of (issue cycle − insertion cycle).
    pub total_wait: Cycle,
    /// Maximal runs of consecutive issues of this class.
    pub bursts: u64,
}

impl ClassStats {
    /// Mean cycles between admission and issue, or 0 if nothing was issued.
    pub fn avg_wait(&self) -> f64 {
        if self.issued == 0 {
            0.0
        } else {
            self.total_wait as f64 / self.issued as f64
        }
    }

    /// Mean length of a burst, or 0 if nothing was issued.
    pub fn avg_burst(&self) -> f64 {
        if self.bursts == 0 {
            0.0
        } else {
            self.issued as f64 / self.bursts as f64
        }
    }
}

/// Counters maintained by every controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    /// Host requests accepted by `insert`.
    pub admitted: u64,
    /// Host requests refused with `Overflow`.
    pub rejected: u64,
    /// Host requests returned by `next`.
    pub issued: u64,
    /// Synthesized `Activate` operations returned by `next`.
    pub activates: u64,
    /// Synthesized `Close` operations returned by `next`.
    pub closes: u64,
    /// Completed blocked periods, copied from the backpressure monitor.
    pub block_episodes: u64,
    /// Total cycles spent blocked (completed periods only), copied from the
    /// backpressure monitor.
    pub blocked_cycles: Cycle,
    /// Per-class counters, indexed by `RequestClass::index`.
    pub classes: [ClassStats; 3],
    last_class: Option<RequestClass>,
}

impl ControllerStats {
    /// Records an admitted host request.
    pub const fn record_admit(&mut self) {
        self.admitted += 1;
    }

    /// Records a rejected host request.
    pub const fn record_reject(&mut self) {
        self.rejected += 1;
    }

    /// Returns a copy carrying the given blocked-time totals.
    #[must_use]
    pub const fn with_blocked(mut self, episodes: u64, cycles: Cycle) -> Self {
        self.block_episodes = episodes;
        self.blocked_cycles = cycles;
        self
    }

    /// Records an operation returned by `next` at cycle `now`.
    pub fn record_issue(&mut self, request: &Request, now: Cycle) {
        match request.command {
            Command::Activate => self.activates += 1,
            Command::Close => self.closes += 1,
            command => {
                self.issued += 1;
                if let Some(class) = command.class() {
                    let entry = &mut self.classes[class.index()];
                    entry.issued += 1;
                    entry.total_wait += now.saturating_sub(request.inserted_at);
                    if self.last_class != Some(class) {
                        entry.bursts += 1;
                        self.last_class = Some(class);
                    }
                }
            }
        }
    }

    /// Counters for one class.
    pub const fn class(&self, class: RequestClass) -> &ClassStats {
        &self.classes[class.index()]
    }

    /// Host accesses served without their own `Activate`.
    pub const fn page_hits(&self) -> u64 {
        self.issued.saturating_sub(self.activates)
    }

    /// Fraction of host accesses that were page hits, in percent.
    pub fn page_hit_rate(&self) -> f64 {
        if self.issued == 0 {
            0.0
        } else {
            100.0 * self.page_hits() as f64 / self.issued as f64
        }
    }

    /// Prints the statistics report to stdout.
    ///
    /// # Arguments
    ///
    /// * `title` - Heading line, usually the policy name.
    pub fn print(&self, title: &str) {
        println!("\n==========================================================");
        println!("MEMORY CONTROLLER STATISTICS ({title})");
        println!("==========================================================");
        println!("ctrl.admitted            {}", self.admitted);
        println!("ctrl.rejected            {}", self.rejected);
        println!("ctrl.issued              {}", self.issued);
        println!("ctrl.activates           {}", self.activates);
        println!("ctrl.closes              {}", self.closes);
        println!(
            "ctrl.page_hits           {} ({:.2}%)",
            self.page_hits(),
            self.page_hit_rate()
        );
        println!("----------------------------------------------------------");
        println!("BACKPRESSURE");
        println!("  bp.episodes            {}", self.block_episodes);
        println!("  bp.blocked_cycles      {}", self.blocked_cycles);
        println!("----------------------------------------------------------");
        println!("TRAFFIC CLASSES");
        for class in RequestClass::ALL {
            let s = self.class(class);
            println!(
                "  {:<8} issued: {:<10} | avg_wait: {:<10.2} | avg_burst: {:.2}",
                class.label(),
                s.issued,
                s.avg_wait(),
                s.avg_burst()
            );
        }
        println!("==========================================================");
    }
}
