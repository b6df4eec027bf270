//! Web server plugin contract.
//!
//! # Data Flow
//! ```text
//! WebServerConfig.plugins (names)
//!     → catalog.rs (name → factory)
//!     → factory(PluginContext) → Box<dyn WebServerPlugin>
//!     → registry.rs (own instances, compile their routes)
//!     → HttpWebServer (dispatch hooks on the resolved route,
//!                      fan out descriptor hooks to every plugin)
//! ```
//!
//! # Design Decisions
//! - One instance per plugin per connection; no state shared across
//!   connections unless the plugin brings its own
//! - Every hook except `name` and `routes` has a no-op default, so a
//!   plugin only implements what it uses
//! - Outcomes that used to be sentinels are named enums

pub mod builtin;
pub mod catalog;
pub mod registry;

use std::sync::Arc;

use crate::config::WebServerConfig;
use crate::http::{HttpRequest, WebsocketFrame};
use crate::net::{ClientConnection, ConnectionId, Descriptor, Descriptors, UpstreamPool};
use crate::observability::{AccessLogContext, EventQueue};
use crate::routing::ProtocolKind;

pub use builtin::builtin_catalog;
pub use catalog::{PluginCatalog, PluginFactory};
pub use registry::{PluginId, PluginRegistry};

/// Everything a plugin receives when it is constructed.
#[derive(Debug, Clone)]
pub struct PluginContext {
    pub uid: ConnectionId,
    pub config: Arc<WebServerConfig>,
    pub client: ClientConnection,
    pub event_queue: Option<EventQueue>,
    pub upstream_pool: Option<UpstreamPool>,
}

/// Result of offering raw client bytes to the resolved route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientDataOutcome {
    /// The plugin consumed the bytes; the dispatcher does nothing more.
    Handled,
    /// The dispatcher should parse the bytes as frames or pipelined requests.
    Unhandled,
}

/// What the route wants done with the access log line.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessLogOutcome {
    /// Log using this context.
    Log(AccessLogContext),
    /// Skip the access log line entirely.
    Suppress,
}

/// A capability installed into the embedded web server.
pub trait WebServerPlugin: Send {
    /// Unique name; the registry key.
    fn name(&self) -> &str;

    /// (protocol kind, path regex) pairs this plugin serves.
    fn routes(&self) -> Vec<(ProtocolKind, String)>;

    /// Whether to accept a WebSocket upgrade for this request.
    fn do_upgrade(&mut self, _request: &HttpRequest) -> bool {
        true
    }

    /// Handle a complete request. Responses are queued on the client handle.
    fn handle_request(&mut self, _request: &HttpRequest) {}

    fn on_websocket_open(&mut self) {}

    fn on_websocket_message(&mut self, _frame: &WebsocketFrame) {}

    /// Offered every raw chunk after the first request, before the
    /// dispatcher interprets it.
    fn on_client_data(&mut self, _request: &HttpRequest, _raw: &[u8]) -> ClientDataOutcome {
        ClientDataOutcome::Unhandled
    }

    fn on_client_connection_close(&mut self) {}

    /// Override or suppress the connection's access log context.
    fn on_access_log(&mut self, context: AccessLogContext) -> AccessLogOutcome {
        AccessLogOutcome::Log(context)
    }

    fn get_descriptors(&mut self) -> Descriptors {
        Descriptors::new()
    }

    /// Returns true when the connection should be torn down.
    fn read_from_descriptors(&mut self, _readables: &[Descriptor]) -> bool {
        false
    }

    /// Returns true when the connection should be torn down.
    fn write_to_descriptors(&mut self, _writables: &[Descriptor]) -> bool {
        false
    }
}
