//! Memory request definitions.
//!
//! A `Request` is the value flowing between the bus and a controller. Host
//! requests (reads and writes) are admitted through `MemoryScheduler::insert`;
//! protocol requests (`Activate`, `Close`) are synthesized by the controller
//! itself and handed back to the bus alongside the host requests.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Cycle;

/// Command carried by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Command {
    /// Demand read.
    #[serde(alias = "read", alias = "READ")]
    Read,
    /// Demand write.
    #[serde(alias = "write", alias = "WRITE")]
    Write,
    /// Write announced ahead of its data; normalized to `Writeback` on admission.
    #[serde(alias = "prewrite", alias = "PREWRITE")]
    Prewrite,
    /// Dirty-line writeback.
    #[serde(alias = "writeback", alias = "WRITEBACK")]
    Writeback,
    /// Opens a DRAM page prior to an access.
    #[serde(alias = "activate", alias = "ACTIVATE")]
    Activate,
    /// Closes (precharges) an open DRAM page.
    #[serde(alias = "close", alias = "CLOSE")]
    Close,
}

impl Command {
    /// Returns `true` for commands a host may submit (everything except `Activate`/`Close`).
    #[inline]
    pub const fn is_host(self) -> bool {
        !self.is_protocol()
    }

    /// Returns `true` for controller-synthesized page commands.
    #[inline]
    pub const fn is_protocol(self) -> bool {
        matches!(self, Self::Activate | Self::Close)
    }

    /// Returns `true` for commands that move data toward memory.
    #[inline]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::Write | Self::Prewrite | Self::Writeback)
    }

    /// Instrumentation class of the command, or `None` for protocol commands.
    pub const fn class(self) -> Option<RequestClass> {
        match self {
            Self::Read => Some(RequestClass::Read),
            Self::Write => Some(RequestClass::Write),
            Self::Prewrite | Self::Writeback => Some(RequestClass::Prewrite),
            Self::Activate | Self::Close => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "Read",
            Self::Write => "Write",
            Self::Prewrite => "Prewrite",
            Self::Writeback => "Writeback",
            Self::Activate => "Activate",
            Self::Close => "Close",
        };
        f.write_str(name)
    }
}

/// Traffic class used for per-class instrumentation.
///
/// `Prewrite` covers both prewrites and writebacks, since a prewrite becomes a
/// writeback at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestClass {
    /// Demand reads.
    Read,
    /// Demand writes.
    Write,
    /// Prewrites and writebacks.
    Prewrite,
}

impl RequestClass {
    /// All classes, in reporting order.
    pub const ALL: [Self; 3] = [Self::Read, Self::Write, Self::Prewrite];

    /// Position of this class in `ALL`.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Read => 0,
            Self::Write => 1,
            Self::Prewrite => 2,
        }
    }

    /// Short lowercase label used in stats output.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Prewrite => "prewrite",
        }
    }
}

/// A memory request.
///
/// Requests are small `Copy` values. A controller stores admitted requests in
/// its own arena and returns an owned copy from `next`, so a value handed to the
/// bus stays valid no matter what the controller does with its slot afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Request {
    /// Caller-assigned tag. Synthesized requests carry the tag of the host
    /// request that caused them.
    pub id: u64,
    /// Physical address.
    pub addr: u64,
    /// Command kind.
    pub command: Command,
    /// Set by the bus once the DRAM has served the request.
    pub satisfied: bool,
    /// Cycle at which the request entered the controller.
    pub inserted_at: Cycle,
}

impl Request {
    /// Creates an unsatisfied request.
    ///
    /// # Arguments
    ///
    /// * `id` - Caller tag used to match completions.
    /// * `addr` - Physical address.
    /// * `command` - Command kind.
    pub const fn new(id: u64, addr: u64, command: Command) -> Self {
        Self {
            id,
            addr,
            command,
            satisfied: false,
            inserted_at: 0,
        }
    }

    /// Shorthand for a `Read` request.
    pub const fn read(id: u64, addr: u64) -> Self {
        Self::new(id, addr, Command::Read)
    }

    /// Shorthand for a `Write` request.
    pub const fn write(id: u64, addr: u64) -> Self {
        Self::new(id, addr, Command::Write)
    }

    /// Shorthand for a `Writeback` request.
    pub const fn writeback(id: u64, addr: u64) -> Self {
        Self::new(id, addr, Command::Writeback)
    }

    /// Synthesized `Activate` for the page containing `addr`.
    pub const fn activate(id: u64, addr: u64, now: Cycle) -> Self {
        Self {
            id,
            addr,
            command: Command::Activate,
            satisfied: false,
            inserted_at: now,
        }
    }

    /// Synthesized `Close` for the page containing `addr`.
    pub const fn close(id: u64, addr: u64, now: Cycle) -> Self {
        Self {
            id,
            addr,
            command: Command::Close,
            satisfied: false,
            inserted_at: now,
        }
    }

    /// Returns `true` if the controller created this request.
    #[inline]
    pub const fn is_synthesized(&self) -> bool {
        self.command.is_protocol()
    }

    /// Rewrites `Prewrite` to `Writeback`; any other command is left alone.
    ///
    /// Called once, at admission.
    #[inline]
    pub const fn normalize(&mut self) {
        if matches!(self.command, Command::Prewrite) {
            self.command = Command::Writeback;
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{:#x}", self.command, self.id, self.addr)
    }
}
