//! Client connection identity and outbound write queue.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing and events
//! - Expose the remote address when the event loop knows it
//! - Buffer outbound byte sequences until the event loop flushes them

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use uuid::Uuid;

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the raw ID value.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Handle to an established client connection.
///
/// Clones share the same write queue. All clones belong to one connection
/// and are driven from one event-loop thread, so the lock is never
/// contended.
#[derive(Debug, Clone)]
pub struct ClientConnection {
    addr: Option<SocketAddr>,
    outbound: Arc<Mutex<VecDeque<Bytes>>>,
}

impl ClientConnection {
    pub fn new(addr: Option<SocketAddr>) -> Self {
        Self {
            addr,
            outbound: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Remote address, if known.
    pub fn addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    /// Append bytes to the write queue.
    pub fn queue(&self, data: impl Into<Bytes>) {
        let data = data.into();
        if data.is_empty() {
            return;
        }
        self.outbound
            .lock()
            .expect("client write queue mutex poisoned")
            .push_back(data);
    }

    /// Whether anything is waiting to be written.
    pub fn has_buffer(&self) -> bool {
        !self
            .outbound
            .lock()
            .expect("client write queue mutex poisoned")
            .is_empty()
    }

    /// Total queued bytes.
    pub fn buffer_size(&self) -> usize {
        self.outbound
            .lock()
            .expect("client write queue mutex poisoned")
            .iter()
            .map(Bytes::len)
            .sum()
    }

    /// Remove and return everything queued, oldest first.
    pub fn take_buffer(&self) -> Vec<Bytes> {
        self.outbound
            .lock()
            .expect("client write queue mutex poisoned")
            .drain(..)
            .collect()
    }
}
