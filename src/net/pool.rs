//! Upstream connection pool shared with plugins.
//!
//! # Responsibilities
//! - Keep idle upstream connections grouped by address
//! - Hand them back out for reuse, most recently released first
//! - Cap the number of idle connections per address

use std::collections::HashMap;
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, Mutex};

/// Default cap on idle connections kept per upstream address.
pub const DEFAULT_MAX_IDLE_PER_HOST: usize = 8;

/// Pool of idle upstream connections.
///
/// The handle is a cheap clone; every plugin of every connection can share
/// the same pool.
#[derive(Debug, Clone)]
pub struct UpstreamPool {
    /// Map of upstream address -> idle connections.
    idle: Arc<Mutex<HashMap<SocketAddr, Vec<TcpStream>>>>,
    max_idle_per_host: usize,
}

impl Default for UpstreamPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDLE_PER_HOST)
    }
}

impl UpstreamPool {
    pub fn new(max_idle_per_host: usize) -> Self {
        Self {
            idle: Arc::new(Mutex::new(HashMap::new())),
            max_idle_per_host,
        }
    }

    /// Take an idle connection to `addr`, if one is pooled.
    pub fn acquire(&self, addr: SocketAddr) -> Option<TcpStream> {
        let mut idle = self.idle.lock().expect("upstream pool mutex poisoned");
        let stream = idle.get_mut(&addr).and_then(Vec::pop);
        if stream.is_some() {
            tracing::trace!(upstream = %addr, "Reusing pooled upstream connection");
        }
        stream
    }

    /// Return a connection for reuse.
    ///
    /// Returns `false` (and drops the stream) when the address already has
    /// `max_idle_per_host` idle connections.
    pub fn release(&self, addr: SocketAddr, stream: TcpStream) -> bool {
        let mut idle = self.idle.lock().expect("upstream pool mutex poisoned");
        let entries = idle.entry(addr).or_default();
        if entries.len() >= self.max_idle_per_host {
            tracing::debug!(upstream = %addr, "Upstream pool full, closing connection");
            return false;
        }
        entries.push(stream);
        true
    }

    /// Number of idle connections to `addr`.
    pub fn idle_count(&self, addr: SocketAddr) -> usize {
        self.idle
            .lock()
            .expect("upstream pool mutex poisoned")
            .get(&addr)
            .map(Vec::len)
            .unwrap_or(0)
    }
}
