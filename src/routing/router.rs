//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes per protocol kind, in registration order
//! - Look up the owning plugin for a path
//! - Return the owner or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after connection setup
//! - O(n) pattern scan (acceptable for typical route counts)
//! - Routes refer to plugins by registry slot, never own them

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::plugin::PluginId;
use crate::routing::matcher::RoutePattern;

/// Which table a request is routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ProtocolKind {
    #[serde(rename = "http")]
    PlainHttp,
    #[serde(rename = "https")]
    EncryptedHttp,
    #[serde(rename = "websocket")]
    WebSocket,
}

impl ProtocolKind {
    /// Classify a first request.
    ///
    /// An upgrade request is WEBSOCKET regardless of encryption.
    pub fn classify(websocket_upgrade: bool, encrypted: bool) -> Self {
        if websocket_upgrade {
            ProtocolKind::WebSocket
        } else if encrypted {
            ProtocolKind::EncryptedHttp
        } else {
            ProtocolKind::PlainHttp
        }
    }

    fn index(self) -> usize {
        match self {
            ProtocolKind::PlainHttp => 0,
            ProtocolKind::EncryptedHttp => 1,
            ProtocolKind::WebSocket => 2,
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProtocolKind::PlainHttp => "http",
            ProtocolKind::EncryptedHttp => "https",
            ProtocolKind::WebSocket => "websocket",
        })
    }
}

/// A (pattern, plugin) binding within one protocol kind.
#[derive(Debug, Clone)]
pub struct Route {
    pub pattern: RoutePattern,
    pub plugin: PluginId,
}

/// Ordered routes for every protocol kind.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    tables: [Vec<Route>; 3],
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route after every route already registered for `kind`.
    pub fn add(&mut self, kind: ProtocolKind, pattern: RoutePattern, plugin: PluginId) {
        self.tables[kind.index()].push(Route { pattern, plugin });
    }

    /// Routes for `kind`, in registration order.
    pub fn routes(&self, kind: ProtocolKind) -> &[Route] {
        &self.tables[kind.index()]
    }

    /// The plugin owning the first pattern that matches `path`.
    pub fn resolve(&self, kind: ProtocolKind, path: &str) -> Option<PluginId> {
        self.routes(kind)
            .iter()
            .find(|route| route.pattern.matches(path))
            .map(|route| route.plugin)
    }

    pub fn len(&self) -> usize {
        self.tables.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
