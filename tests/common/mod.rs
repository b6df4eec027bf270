//! Shared utilities for dispatch integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use web_dispatch::config::WebServerConfig;
use web_dispatch::http::{HttpParser, HttpRequest, WebsocketFrame};
use web_dispatch::net::{ClientConnection, ConnectionId, Descriptor, Descriptors};
use web_dispatch::observability::{AccessLogContext, EventQueue};
use web_dispatch::plugin::{AccessLogOutcome, ClientDataOutcome, PluginCatalog, PluginContext};
use web_dispatch::routing::ProtocolKind;
use web_dispatch::{HttpWebServer, WebServerPlugin};

/// Hook invocation seen by a [`RecordingPlugin`], tagged with the
/// reporting instance's label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Request(&'static str, String),
    WebSocketOpen(&'static str),
    WebSocketMessage(&'static str, Vec<u8>),
    ClientData(&'static str, usize),
    Close(&'static str),
    Read(&'static str),
    Write(&'static str),
}

pub type Recorder = Arc<Mutex<Vec<Call>>>;

/// How a recording plugin behaves. Cloned into every instance a factory
/// builds.
#[derive(Clone)]
pub struct Behavior {
    pub label: &'static str,
    pub name: &'static str,
    pub routes: Vec<(ProtocolKind, String)>,
    pub accept_upgrade: bool,
    pub client_data: ClientDataOutcome,
    pub access_log: Option<AccessLogContext>,
    pub suppress_access_log: bool,
    pub descriptors: Vec<i32>,
    pub teardown_on_read: bool,
    pub teardown_on_write: bool,
}

impl Behavior {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            name: label,
            routes: Vec::new(),
            accept_upgrade: true,
            client_data: ClientDataOutcome::Unhandled,
            access_log: None,
            suppress_access_log: false,
            descriptors: Vec::new(),
            teardown_on_read: false,
            teardown_on_write: false,
        }
    }

    pub fn route(mut self, kind: ProtocolKind, pattern: &str) -> Self {
        self.routes.push((kind, pattern.to_string()));
        self
    }
}

pub struct RecordingPlugin {
    behavior: Behavior,
    calls: Recorder,
}

impl WebServerPlugin for RecordingPlugin {
    fn name(&self) -> &str {
        self.behavior.name
    }

    fn routes(&self) -> Vec<(ProtocolKind, String)> {
        self.behavior.routes.clone()
    }

    fn do_upgrade(&mut self, _request: &HttpRequest) -> bool {
        self.behavior.accept_upgrade
    }

    fn handle_request(&mut self, request: &HttpRequest) {
        self.record(Call::Request(self.behavior.label, request.path().to_string()));
    }

    fn on_websocket_open(&mut self) {
        self.record(Call::WebSocketOpen(self.behavior.label));
    }

    fn on_websocket_message(&mut self, frame: &WebsocketFrame) {
        self.record(Call::WebSocketMessage(self.behavior.label, frame.payload().to_vec()));
    }

    fn on_client_data(&mut self, _request: &HttpRequest, raw: &[u8]) -> ClientDataOutcome {
        self.record(Call::ClientData(self.behavior.label, raw.len()));
        self.behavior.client_data
    }

    fn on_client_connection_close(&mut self) {
        self.record(Call::Close(self.behavior.label));
    }

    fn on_access_log(&mut self, context: AccessLogContext) -> AccessLogOutcome {
        if self.behavior.suppress_access_log {
            return AccessLogOutcome::Suppress;
        }
        AccessLogOutcome::Log(self.behavior.access_log.clone().unwrap_or(context))
    }

    fn get_descriptors(&mut self) -> Descriptors {
        let mut descriptors = Descriptors::new();
        descriptors
            .readables
            .extend(self.behavior.descriptors.iter().copied().map(Descriptor));
        descriptors
    }

    fn read_from_descriptors(&mut self, _readables: &[Descriptor]) -> bool {
        self.record(Call::Read(self.behavior.label));
        self.behavior.teardown_on_read
    }

    fn write_to_descriptors(&mut self, _writables: &[Descriptor]) -> bool {
        self.record(Call::Write(self.behavior.label));
        self.behavior.teardown_on_write
    }
}

impl RecordingPlugin {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

/// One connection handler wired to recording plugins.
pub struct Harness {
    pub server: HttpWebServer,
    pub client: ClientConnection,
    pub calls: Recorder,
}

impl Harness {
    pub fn new(behaviors: Vec<Behavior>) -> Self {
        Self::with_config(behaviors, WebServerConfig::default(), None)
    }

    pub fn with_config(
        behaviors: Vec<Behavior>,
        mut config: WebServerConfig,
        events: Option<EventQueue>,
    ) -> Self {
        let calls: Recorder = Arc::default();
        let mut catalog = PluginCatalog::new();
        config.plugins.clear();
        for behavior in behaviors {
            config.plugins.push(behavior.label.to_string());
            let calls = calls.clone();
            catalog.register(behavior.label, move |_| {
                Box::new(RecordingPlugin {
                    behavior: behavior.clone(),
                    calls: calls.clone(),
                })
            });
        }

        let client = ClientConnection::new(Some("127.0.0.1:50000".parse().unwrap()));
        let context = PluginContext {
            uid: ConnectionId::new(),
            config: Arc::new(config),
            client: client.clone(),
            event_queue: events,
            upstream_pool: None,
        };
        let server = HttpWebServer::new(&catalog, context).unwrap();
        Self {
            server,
            client,
            calls,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Everything queued on the client so far, concatenated.
    pub fn take_output(&self) -> Vec<u8> {
        self.client.take_buffer().concat()
    }
}

/// Parse one complete request from `raw`.
pub fn request(raw: &[u8]) -> HttpRequest {
    let mut parser = HttpParser::new();
    parser.parse(raw).unwrap();
    parser.into_request().unwrap()
}

pub fn get(path: &str) -> HttpRequest {
    request(format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nUser-Agent: tester/1.0\r\n\r\n").as_bytes())
}

pub const WS_KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";

pub fn websocket_upgrade(path: &str) -> HttpRequest {
    request(
        format!(
            "GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: Upgrade\r\n\
             Upgrade: websocket\r\nSec-WebSocket-Key: {WS_KEY}\r\n\
             Sec-WebSocket-Version: 13\r\n\r\n"
        )
        .as_bytes(),
    )
}
