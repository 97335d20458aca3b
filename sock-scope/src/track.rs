//! Per-socket correlation state
//!
//! Probes fire from arbitrary host threads, so the registry is a sharded
//! concurrent map keyed by an opaque socket identity. There are no weak
//! references to the socket itself (keys are plain integers); instead the
//! close/destroy probe calls [`SocketRegistry::release`] so the telemetry
//! layer never keeps a dead socket's record around.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use dashmap::DashMap;

use crate::domain::{Direction, SocketDescription};

/// Tracking record for one live socket.
#[derive(Debug)]
pub struct SocketTrack {
    pub description: SocketDescription,
    /// Pending start timestamp per direction, taken by the matching end probe.
    pending: [Mutex<Option<Instant>>; 2],
}

impl SocketTrack {
    fn new(description: SocketDescription) -> Self {
        SocketTrack { description, pending: [Mutex::new(None), Mutex::new(None)] }
    }

    /// Start-timer probe: remember when this direction's operation began.
    pub fn begin(&self, direction: Direction, at: Instant) {
        *self.pending[direction.index()].lock().unwrap() = Some(at);
    }

    /// Stop-timer probe: take the pending start, if the start probe ran.
    pub fn end(&self, direction: Direction, at: Instant) -> Option<(Instant, Instant)> {
        self.pending[direction.index()].lock().unwrap().take().map(|start| (start, at))
    }
}

/// Identity-keyed map from socket to tracking record.
#[derive(Debug, Default)]
pub struct SocketRegistry {
    sockets: DashMap<u64, Arc<SocketTrack>>,
}

impl SocketRegistry {
    pub fn new() -> Self {
        SocketRegistry::default()
    }

    pub fn track(&self, id: u64, description: SocketDescription) -> Arc<SocketTrack> {
        let track = Arc::new(SocketTrack::new(description));
        self.sockets.insert(id, Arc::clone(&track));
        track
    }

    pub fn lookup(&self, id: u64) -> Option<Arc<SocketTrack>> {
        self.sockets.get(&id).map(|entry| Arc::clone(&entry))
    }

    /// Eviction hook, invoked when the underlying socket is closed.
    pub fn release(&self, id: u64) -> bool {
        self.sockets.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sockets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sockets.is_empty()
    }
}
