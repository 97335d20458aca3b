//! Configuration and endpoint-filter types.
//!
//! A `Config` is built once by the argument parser and shared read-only for
//! the rest of the session's life. Probes consult it (through the session) on
//! every socket decision, so everything here is plain data plus small
//! predicates.

use std::time::Duration;

/// Latency measurement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Input-to-output: request read until response write.
    I2o,
    /// Output-to-input: request write until response read.
    O2i,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::I2o => "i2o",
            Direction::O2i => "o2i",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Direction::I2o => 0,
            Direction::O2i => 1,
        }
    }
}

/// The endpoint triple a probe observed on a live socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketDescription {
    pub local_port: String,
    pub remote_addr: String,
    pub remote_port: String,
}

/// Partial-match predicate over (local port, remote address, remote port).
///
/// Absent fields match every value. Entries are created during argument
/// parsing and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterEntry {
    pub local_port: Option<String>,
    pub remote_addr: Option<String>,
    pub remote_port: Option<String>,
}

impl FilterEntry {
    pub fn new(
        local_port: Option<String>,
        remote_addr: Option<String>,
        remote_port: Option<String>,
    ) -> Self {
        FilterEntry { local_port, remote_addr, remote_port }
    }

    /// Single-dimension sugar: filter by local port only.
    pub fn local_port(port: String) -> Self {
        FilterEntry::new(Some(port), None, None)
    }

    /// Single-dimension sugar: filter by remote address only.
    pub fn remote_addr(addr: String) -> Self {
        FilterEntry::new(None, Some(addr), None)
    }

    /// Single-dimension sugar: filter by remote port only.
    pub fn remote_port(port: String) -> Self {
        FilterEntry::new(None, None, Some(port))
    }

    /// Every present field must equal the observed value.
    pub fn matches(&self, socket: &SocketDescription) -> bool {
        self.local_port.as_ref().is_none_or(|p| *p == socket.local_port)
            && self.remote_addr.as_ref().is_none_or(|a| *a == socket.remote_addr)
            && self.remote_port.as_ref().is_none_or(|p| *p == socket.remote_port)
    }
}

/// Startup parameters for one instrumentation session.
///
/// Mutated only by the argument parser; afterwards shared behind an `Arc` and
/// read concurrently by probes and the log writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub filter_entries: Vec<FilterEntry>,
    pub log_writer_interval: Duration,
    pub start_delaying: Duration,
    /// Zero means unlimited.
    pub working_time: Duration,
    pub log_prefix: String,
    pub uuid: String,
    pub i2o_enabled: bool,
    pub o2i_enabled: bool,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            filter_entries: Vec::new(),
            log_writer_interval: Duration::from_millis(1000),
            start_delaying: Duration::ZERO,
            working_time: Duration::ZERO,
            log_prefix: "sock-scope".to_string(),
            uuid: uuid::Uuid::new_v4().to_string(),
            i2o_enabled: true,
            o2i_enabled: true,
            debug: false,
        }
    }
}

impl Config {
    /// Empty filter set matches everything; otherwise a socket must match at
    /// least one entry.
    pub fn matches(&self, socket: &SocketDescription) -> bool {
        self.filter_entries.is_empty() || self.filter_entries.iter().any(|e| e.matches(socket))
    }

    pub fn direction_enabled(&self, direction: Direction) -> bool {
        match direction {
            Direction::I2o => self.i2o_enabled,
            Direction::O2i => self.o2i_enabled,
        }
    }
}
