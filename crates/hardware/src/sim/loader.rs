//! Request trace loading.
//!
//! A trace is a JSON array of arrivals:
//!
//! ```json
//! [
//!   { "cycle": 0, "addr": 5120, "command": "Read" },
//!   { "cycle": 3, "addr": 9216, "command": "Write", "id": 42 }
//! ]
//! ```
//!
//! Entries without an `id` are tagged with their position in the file.
//! Entries are replayed in cycle order; entries sharing a cycle keep file order.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::{Command, Cycle, Request};

/// Failure to obtain a trace.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The file could not be read.
    #[error("could not read trace '{path}': {source}")]
    Io {
        /// Path as given.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The contents are not a valid trace.
    #[error("malformed trace: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One host request arriving on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Arrival cycle.
    pub cycle: Cycle,
    /// Physical address.
    pub addr: u64,
    /// Command; must be a host command.
    pub command: Command,
    /// Optional caller tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl TraceEntry {
    /// Creates an untagged entry.
    pub const fn new(cycle: Cycle, addr: u64, command: Command) -> Self {
        Self {
            cycle,
            addr,
            command,
            id: None,
        }
    }

    /// The request this entry submits; `fallback_id` is used when the entry has no tag.
    pub const fn request(&self, fallback_id: u64) -> Request {
        let id = match self.id {
            Some(id) => id,
            None => fallback_id,
        };
        Request::new(id, self.addr, self.command)
    }
}

/// Arrival-ordered sequence of trace entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    /// Builds a trace, assigning positional ids and ordering entries by cycle.
    pub fn new(entries: Vec<TraceEntry>) -> Self {
        let mut entries: Vec<TraceEntry> = entries
            .into_iter()
            .enumerate()
            .map(|(i, mut e)| {
                e.id = Some(e.id.unwrap_or(i as u64));
                e
            })
            .collect();
        entries.sort_by_key(|e| e.cycle);
        Self { entries }
    }

    /// Parses a trace from JSON text.
    ///
    /// # Errors
    ///
    /// `TraceError::Parse` if the text is not a JSON array of entries.
    pub fn from_json(text: &str) -> Result<Self, TraceError> {
        let entries: Vec<TraceEntry> = serde_json::from_str(text)?;
        Ok(Self::new(entries))
    }

    /// Reads and parses a trace file.
    ///
    /// # Errors
    ///
    /// `TraceError::Io` if the file cannot be read, `TraceError::Parse` if it is malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| TraceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Entries in replay order.
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the trace has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<TraceEntry> for Trace {
    fn from_iter<I: IntoIterator<Item = TraceEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
