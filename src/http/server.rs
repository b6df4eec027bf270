//! Per-connection request dispatch.
//!
//! # Responsibilities
//! - Resolve the first request of a connection to a plugin route
//! - Upgrade to WebSocket when the route accepts it
//! - Fall back to static files or a fixed 404
//! - Feed later bytes to WebSocket frame decoding or pipelined parsing
//! - Count bytes and emit the access log line at teardown
//! - Fan out descriptor readiness to every plugin
//!
//! # State Machine
//! ```text
//! AwaitingFirstRequest ──route──▶ RouteResolved ──upgrade──▶ ProtocolSwitched
//!          │
//!          └──no route──▶ StaticOr404
//! ```
//!
//! # Design Decisions
//! - The route is resolved once; pipelined requests reuse it
//! - Protocol faults are returned as `Err` and end the connection; routing
//!   misses are answered, never errors
//! - Everything runs on the connection's event-loop thread; counters are
//!   plain fields

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::header;
use http::Method;
use serde_json::{json, Map, Value};

use crate::config::{ConfigError, WebServerConfig};
use crate::error::ProtocolError;
use crate::http::parser::HttpParser;
use crate::http::request::HttpRequest;
use crate::http::response::{build_websocket_handshake_response, not_found_response};
use crate::http::static_files::{resolve_path, serve_static_file};
use crate::http::websocket::{key_to_accept, Opcode, WebsocketFrame};
use crate::net::{ClientConnection, ConnectionId, Descriptor, Descriptors};
use crate::observability::events::REQUEST_COMPLETE;
use crate::observability::logging::ACCESS_LOG_TARGET;
use crate::observability::metrics::{self, DispatchOutcome};
use crate::observability::{format_access_log, AccessLogContext, EventQueue};
use crate::plugin::{
    AccessLogOutcome, ClientDataOutcome, PluginCatalog, PluginContext, PluginId, PluginRegistry,
};
use crate::routing::{ProtocolKind, RouteTable};

const PUBLISHER_ID: &str = "HttpWebServer";

/// Where the connection is in its routing lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    AwaitingFirstRequest,
    /// A plugin owns the connection.
    RouteResolved,
    /// No plugin matched; a static file or 404 was queued.
    StaticOr404,
    /// Upgraded to WebSocket; every further byte is a frame.
    ProtocolSwitched,
}

/// What the event loop should do after the first request was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDisposition {
    /// A route owns the connection; keep reading.
    KeepOpen,
    /// The request cycle is over once the queued response is flushed.
    Finished,
}

#[derive(Debug)]
struct ConnectionState {
    start_time: Instant,
    dispatch: DispatchState,
    switched_protocol: Option<ProtocolKind>,
    route: Option<PluginId>,
    pipeline_request: Option<HttpParser>,
    frame: WebsocketFrame,
    response_size: u64,
    post_request_data_size: u64,
}

impl ConnectionState {
    fn new() -> Self {
        Self {
            start_time: Instant::now(),
            dispatch: DispatchState::AwaitingFirstRequest,
            switched_protocol: None,
            route: None,
            pipeline_request: None,
            frame: WebsocketFrame::new(),
            response_size: 0,
            post_request_data_size: 0,
        }
    }
}

/// The embedded web server's handler for one client connection.
#[derive(Debug)]
pub struct HttpWebServer {
    uid: ConnectionId,
    config: Arc<WebServerConfig>,
    client: ClientConnection,
    event_queue: Option<EventQueue>,
    plugins: PluginRegistry,
    routes: RouteTable,
    request: Option<HttpRequest>,
    state: ConnectionState,
}

impl HttpWebServer {
    /// Build the handler and every configured plugin for one connection.
    pub fn new(catalog: &PluginCatalog, context: PluginContext) -> Result<Self, ConfigError> {
        let (plugins, routes) = PluginRegistry::initialize(catalog, &context)?;
        tracing::debug!(
            connection_id = %context.uid,
            plugins = plugins.len(),
            routes = routes.len(),
            "Web server plugins initialized"
        );

        Ok(Self {
            uid: context.uid,
            config: context.config,
            client: context.client,
            event_queue: context.event_queue,
            plugins,
            routes,
            request: None,
            state: ConnectionState::new(),
        })
    }

    pub fn uid(&self) -> ConnectionId {
        self.uid
    }

    pub fn dispatch_state(&self) -> DispatchState {
        self.state.dispatch
    }

    pub fn switched_protocol(&self) -> Option<ProtocolKind> {
        self.state.switched_protocol
    }

    /// Name of the plugin owning this connection, if any.
    pub fn route_name(&self) -> Option<&str> {
        self.state
            .route
            .map(|id| self.plugins.instance(id).name())
    }

    /// The first request of the connection, once complete.
    pub fn request(&self) -> Option<&HttpRequest> {
        self.request.as_ref()
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Bytes handed to the write path so far.
    pub fn response_size(&self) -> u64 {
        self.state.response_size
    }

    /// Bytes received after the first request completed.
    pub fn post_request_data_size(&self) -> u64 {
        self.state.post_request_data_size
    }

    fn encryption_enabled(&self) -> bool {
        self.config.encryption_enabled()
    }

    /// Dispatch the first complete request of the connection.
    pub fn on_request_complete(
        &mut self,
        request: HttpRequest,
    ) -> Result<RequestDisposition, ProtocolError> {
        if self.state.dispatch != DispatchState::AwaitingFirstRequest {
            tracing::warn!(connection_id = %self.uid, "First request completed twice, ignoring");
            return Ok(RequestDisposition::KeepOpen);
        }

        self.emit_request_complete(&request);

        let path = if request.path().is_empty() {
            "/".to_string()
        } else {
            request.path().to_string()
        };

        let routed = self
            .try_route(&path, &request)
            .inspect_err(|e| self.note_fault(e));
        self.request = Some(request);
        if routed? {
            return Ok(RequestDisposition::KeepOpen);
        }

        self.state.dispatch = DispatchState::StaticOr404;
        if self.config.static_server.enabled {
            self.try_static_or_404(&path);
            metrics::record_dispatch(DispatchOutcome::Static);
        } else {
            tracing::debug!(connection_id = %self.uid, path = %path, "No route matched");
            self.client.queue(not_found_response(&self.config.server_agent));
            metrics::record_dispatch(DispatchOutcome::NotFound);
        }
        Ok(RequestDisposition::Finished)
    }

    /// Resolve and dispatch; `Ok(true)` when a route took the request.
    fn try_route(&mut self, path: &str, request: &HttpRequest) -> Result<bool, ProtocolError> {
        let do_ws_upgrade = request.is_websocket_upgrade();
        let protocol = ProtocolKind::classify(do_ws_upgrade, self.encryption_enabled());

        let Some(id) = self.routes.resolve(protocol, path) else {
            return Ok(false);
        };
        self.state.route = Some(id);
        self.state.dispatch = DispatchState::RouteResolved;

        let plugin = self.plugins.instance_mut(id);
        tracing::debug!(
            connection_id = %self.uid,
            plugin = plugin.name(),
            protocol = %protocol,
            path = %path,
            "Route resolved"
        );

        if do_ws_upgrade && plugin.do_upgrade(request) {
            let key = request
                .header(header::SEC_WEBSOCKET_KEY)
                .ok_or(ProtocolError::MissingWebSocketKey)?;
            self.client
                .queue(build_websocket_handshake_response(&key_to_accept(key.as_bytes())));
            self.state.switched_protocol = Some(ProtocolKind::WebSocket);
            self.state.dispatch = DispatchState::ProtocolSwitched;
            plugin.on_websocket_open();
            metrics::record_dispatch(DispatchOutcome::Upgraded);
        } else {
            plugin.handle_request(request);
            metrics::record_dispatch(DispatchOutcome::Routed);
        }
        Ok(true)
    }

    fn try_static_or_404(&self, path: &str) {
        // Routing saw the query string; the filesystem must not.
        let path = path.split('?').next().unwrap_or_default();
        let static_server = &self.config.static_server;
        let response = match resolve_path(&static_server.root_dir, path) {
            Some(file) => serve_static_file(
                &file,
                static_server.min_compression_length,
                &self.config.server_agent,
            ),
            None => {
                tracing::debug!(connection_id = %self.uid, path = %path, "Unsafe static path");
                not_found_response(&self.config.server_agent)
            }
        };
        self.client.queue(response);
    }

    fn emit_request_complete(&self, request: &HttpRequest) {
        if !self.config.events.enabled {
            return;
        }
        let Some(queue) = &self.event_queue else {
            return;
        };

        let headers: Map<String, Value> = request
            .header_pairs()
            .map(|(name, value)| (name.as_str().to_string(), Value::String(value)))
            .collect();
        let body = if *request.method() == Method::POST {
            Value::String(String::from_utf8_lossy(request.body()).into_owned())
        } else {
            Value::Null
        };
        let payload = json!({
            "url": format!(
                "http://{}{}",
                request.header_str(header::HOST).unwrap_or_default(),
                request.path()
            ),
            "method": request.method().as_str(),
            "headers": headers,
            "body": body,
        });
        queue.publish(self.uid.to_string(), REQUEST_COMPLETE, payload, PUBLISHER_ID);
    }

    /// Process a raw chunk received after the first request.
    ///
    /// An `Err` means the connection must be torn down now.
    pub fn on_client_data(&mut self, raw: &[u8]) -> Result<(), ProtocolError> {
        self.state.post_request_data_size += raw.len() as u64;
        self.dispatch_client_data(raw)
            .inspect_err(|e| self.note_fault(e))
    }

    fn note_fault(&self, err: &ProtocolError) {
        tracing::debug!(connection_id = %self.uid, error = %err, "Protocol fault, tearing down");
        metrics::record_protocol_fault(err.kind());
    }

    fn dispatch_client_data(&mut self, raw: &[u8]) -> Result<(), ProtocolError> {
        let (Some(route), Some(request)) = (self.state.route, self.request.as_ref()) else {
            return Ok(());
        };

        let plugin = self.plugins.instance_mut(route);
        if plugin.on_client_data(request, raw) == ClientDataOutcome::Handled {
            return Ok(());
        }

        if self.state.switched_protocol == Some(ProtocolKind::WebSocket) {
            return self.forward_websocket_frames(route, raw);
        }

        if request.is_http_1_1_keep_alive() {
            return self.parse_pipeline(route, raw);
        }
        Ok(())
    }

    fn forward_websocket_frames(&mut self, route: PluginId, raw: &[u8]) -> Result<(), ProtocolError> {
        let mut remaining = raw;
        while !remaining.is_empty() {
            remaining = self.state.frame.parse(remaining)?;
            if !self.state.frame.is_complete() {
                // Rest of the frame arrives with a later chunk.
                break;
            }
            if self.state.frame.opcode() == Some(Opcode::ConnectionClose) {
                return Err(ProtocolError::ClientClosed);
            }
            self.plugins
                .instance_mut(route)
                .on_websocket_message(&self.state.frame);
            self.state.frame.reset();
        }
        Ok(())
    }

    fn parse_pipeline(&mut self, route: PluginId, raw: &[u8]) -> Result<(), ProtocolError> {
        let mut remaining = raw;
        while !remaining.is_empty() {
            let parser = self.state.pipeline_request.get_or_insert_with(HttpParser::new);
            remaining = parser.parse(remaining)?;
            if !parser.is_complete() {
                break;
            }

            let Some(request) = self
                .state
                .pipeline_request
                .take()
                .and_then(HttpParser::into_request)
            else {
                break;
            };
            self.plugins.instance_mut(route).handle_request(&request);
            if !request.is_http_1_1_keep_alive() {
                return Err(ProtocolError::PipelineNotKeepAlive);
            }
        }
        Ok(())
    }

    /// Count outbound bytes; the chunks pass through untouched.
    pub fn on_response_chunk(&mut self, chunk: Vec<Bytes>) -> Vec<Bytes> {
        self.state.response_size += chunk.iter().map(|c| c.len() as u64).sum::<u64>();
        chunk
    }

    /// First request plus every byte received after it.
    fn request_bytes(&self) -> u64 {
        let first = self.request.as_ref().map_or(0, |r| r.total_size() as u64);
        first + self.state.post_request_data_size
    }

    fn access_log_context(&self) -> AccessLogContext {
        let addr = self.client.addr();
        let request = self.request.as_ref();
        let elapsed_ms = self.state.start_time.elapsed().as_secs_f64() * 1000.0;

        let mut context = AccessLogContext::new();
        context.insert("client_ip".into(), json!(addr.map(|a| a.ip().to_string())));
        context.insert("client_port".into(), json!(addr.map(|a| a.port())));
        context.insert("connection_time_ms".into(), json!(format!("{elapsed_ms:.2}")));
        context.insert(
            "request_method".into(),
            json!(request.map(|r| r.method().as_str().to_string())),
        );
        context.insert("request_path".into(), json!(request.map(|r| r.path().to_string())));
        context.insert("request_bytes".into(), json!(self.request_bytes()));
        let user_agent = request
            .and_then(|r| r.header(header::USER_AGENT))
            .map(|ua| String::from_utf8_lossy(ua.as_bytes()).into_owned());
        context.insert("request_ua".into(), json!(user_agent));
        context.insert(
            "request_version".into(),
            json!(request.map(|r| format!("{:?}", r.version()))),
        );
        context.insert("response_bytes".into(), json!(self.state.response_size));
        context
    }

    /// Teardown: notify the route and emit the access log line.
    ///
    /// Returns the line that was logged, or `None` when the route
    /// suppressed it.
    pub fn on_client_connection_close(&mut self) -> Option<String> {
        let context = self.access_log_context();
        metrics::record_connection_bytes(self.request_bytes(), self.state.response_size);

        let context = match self.state.route {
            Some(id) => {
                let plugin = self.plugins.instance_mut(id);
                plugin.on_client_connection_close();
                match plugin.on_access_log(context) {
                    AccessLogOutcome::Log(context) => Some(context),
                    AccessLogOutcome::Suppress => None,
                }
            }
            None => Some(context),
        }?;

        let line = format_access_log(&self.config.access_log.format, &context);
        tracing::info!(target: ACCESS_LOG_TARGET, connection_id = %self.uid, "{line}");
        Some(line)
    }

    /// Union of every plugin's descriptor interest.
    pub fn get_descriptors(&mut self) -> Descriptors {
        let mut descriptors = Descriptors::new();
        for id in self.plugins.active_ids() {
            descriptors.extend(self.plugins.instance_mut(id).get_descriptors());
        }
        descriptors
    }

    /// Returns true as soon as one plugin asks for teardown.
    pub fn read_from_descriptors(&mut self, readables: &[Descriptor]) -> bool {
        for id in self.plugins.active_ids() {
            let plugin = self.plugins.instance_mut(id);
            if plugin.read_from_descriptors(readables) {
                tracing::debug!(connection_id = %self.uid, plugin = plugin.name(), "Plugin requested teardown on read");
                return true;
            }
        }
        false
    }

    /// Returns true as soon as one plugin asks for teardown.
    pub fn write_to_descriptors(&mut self, writables: &[Descriptor]) -> bool {
        for id in self.plugins.active_ids() {
            let plugin = self.plugins.instance_mut(id);
            if plugin.write_to_descriptors(writables) {
                tracing::debug!(connection_id = %self.uid, plugin = plugin.name(), "Plugin requested teardown on write");
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpParser;

    struct Root {
        handled: Arc<std::sync::Mutex<Vec<String>>>,
    }

    impl crate::plugin::WebServerPlugin for Root {
        fn name(&self) -> &str {
            "root"
        }

        fn routes(&self) -> Vec<(ProtocolKind, String)> {
            vec![
                (ProtocolKind::PlainHttp, "/$".into()),
                (ProtocolKind::WebSocket, "/ws".into()),
            ]
        }

        fn handle_request(&mut self, request: &HttpRequest) {
            self.handled
                .lock()
                .expect("handled lock")
                .push(request.path().to_string());
        }
    }

    fn server(
        events: Option<EventQueue>,
    ) -> (HttpWebServer, ClientConnection, Arc<std::sync::Mutex<Vec<String>>>) {
        let enabled = events.is_some();
        server_with(events, enabled)
    }

    fn server_with(
        events: Option<EventQueue>,
        events_enabled: bool,
    ) -> (HttpWebServer, ClientConnection, Arc<std::sync::Mutex<Vec<String>>>) {
        let handled = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut catalog = PluginCatalog::new();
        let shared = handled.clone();
        catalog.register("root", move |_| {
            Box::new(Root {
                handled: shared.clone(),
            })
        });

        let mut config = WebServerConfig {
            plugins: vec!["root".into()],
            ..WebServerConfig::default()
        };
        config.events.enabled = events_enabled;
        let client = ClientConnection::new(None);
        let context = PluginContext {
            uid: ConnectionId::new(),
            config: Arc::new(config),
            client: client.clone(),
            event_queue: events,
            upstream_pool: None,
        };
        let server = HttpWebServer::new(&catalog, context).unwrap();
        (server, client, handled)
    }

    fn request(raw: &[u8]) -> HttpRequest {
        let mut parser = HttpParser::new();
        parser.parse(raw).unwrap();
        parser.into_request().unwrap()
    }

    #[test]
    fn starts_awaiting_first_request() {
        let (server, _, _) = server(None);
        assert_eq!(server.dispatch_state(), DispatchState::AwaitingFirstRequest);
        assert!(server.route_name().is_none());
        assert_eq!(server.routes().len(), 2);
    }

    #[test]
    fn routed_request_keeps_connection_open() {
        let (mut server, client, handled) = server(None);
        let disposition = server
            .on_request_complete(request(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n"))
            .unwrap();

        assert_eq!(disposition, RequestDisposition::KeepOpen);
        assert_eq!(server.dispatch_state(), DispatchState::RouteResolved);
        assert_eq!(server.route_name(), Some("root"));
        assert_eq!(*handled.lock().unwrap(), vec!["/"]);
        assert!(!client.has_buffer());
    }

    #[test]
    fn upgrade_without_key_queues_nothing() {
        let (mut server, client, _) = server(None);
        let err = server
            .on_request_complete(request(
                b"GET /ws HTTP/1.1\r\nHost: a\r\nConnection: Upgrade\r\nUpgrade: websocket\r\n\r\n",
            ))
            .unwrap_err();

        assert!(matches!(err, ProtocolError::MissingWebSocketKey));
        assert!(!client.has_buffer());
        assert_eq!(server.switched_protocol(), None);
    }

    #[test]
    fn data_before_first_request_is_only_counted() {
        let (mut server, _, handled) = server(None);
        server.on_client_data(b"GET / HTTP/1.1\r\n\r\n").unwrap();

        assert_eq!(server.post_request_data_size(), 18);
        assert!(handled.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn publishes_request_complete_with_post_body() {
        let (queue, mut rx) = EventQueue::channel();
        let (mut server, _, _) = server(Some(queue));
        server
            .on_request_complete(request(
                b"POST / HTTP/1.1\r\nHost: example.com\r\nContent-Length: 4\r\n\r\nping",
            ))
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_name, REQUEST_COMPLETE);
        assert_eq!(event.request_id, server.uid().to_string());
        assert_eq!(event.publisher_id, PUBLISHER_ID);
        assert_eq!(event.event_payload["url"], "http://example.com/");
        assert_eq!(event.event_payload["method"], "POST");
        assert_eq!(event.event_payload["headers"]["host"], "example.com");
        assert_eq!(event.event_payload["body"], "ping");
    }

    #[tokio::test]
    async fn get_requests_carry_no_body() {
        let (queue, mut rx) = EventQueue::channel();
        let (mut server, _, _) = server(Some(queue));
        server
            .on_request_complete(request(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n"))
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert!(event.event_payload["body"].is_null());
    }

    #[test]
    fn disabled_events_publish_nothing() {
        let (queue, mut rx) = EventQueue::channel();
        let (mut server, _, handled) = server_with(Some(queue), false);
        server
            .on_request_complete(request(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n"))
            .unwrap();

        assert_eq!(*handled.lock().unwrap(), vec!["/"]);
        assert!(matches!(
            rx.try_recv(),
            Err(tokio::sync::mpsc::error::TryRecvError::Empty)
        ));
    }

    #[test]
    fn enabled_events_without_queue_still_dispatch() {
        let (mut server, _, handled) = server_with(None, true);
        let disposition = server
            .on_request_complete(request(b"GET / HTTP/1.1\r\nHost: a\r\n\r\n"))
            .unwrap();

        assert_eq!(disposition, RequestDisposition::KeepOpen);
        assert_eq!(*handled.lock().unwrap(), vec!["/"]);
    }

    struct Bare;

    impl crate::plugin::WebServerPlugin for Bare {
        fn name(&self) -> &str {
            "bare"
        }

        fn routes(&self) -> Vec<(ProtocolKind, String)> {
            vec![(ProtocolKind::PlainHttp, "/".into())]
        }
    }

    #[test]
    fn plugin_with_only_name_and_routes_handles_requests() {
        let mut catalog = PluginCatalog::new();
        catalog.register("bare", |_| Box::new(Bare));
        let config = WebServerConfig {
            plugins: vec!["bare".into()],
            ..WebServerConfig::default()
        };
        let client = ClientConnection::new(None);
        let context = PluginContext {
            uid: ConnectionId::new(),
            config: Arc::new(config),
            client: client.clone(),
            event_queue: None,
            upstream_pool: None,
        };
        let mut server = HttpWebServer::new(&catalog, context).unwrap();

        let disposition = server
            .on_request_complete(request(b"GET /anything HTTP/1.1\r\nHost: a\r\n\r\n"))
            .unwrap();

        assert_eq!(disposition, RequestDisposition::KeepOpen);
        assert_eq!(server.route_name(), Some("bare"));
        assert!(!client.has_buffer());
    }

    /// Captures `web_protocol_faults_total` increments.
    struct FaultRecorder {
        faults: Arc<std::sync::atomic::AtomicU64>,
    }

    impl ::metrics::Recorder for FaultRecorder {
        fn describe_counter(
            &self,
            _: ::metrics::KeyName,
            _: Option<::metrics::Unit>,
            _: ::metrics::SharedString,
        ) {
        }

        fn describe_gauge(
            &self,
            _: ::metrics::KeyName,
            _: Option<::metrics::Unit>,
            _: ::metrics::SharedString,
        ) {
        }

        fn describe_histogram(
            &self,
            _: ::metrics::KeyName,
            _: Option<::metrics::Unit>,
            _: ::metrics::SharedString,
        ) {
        }

        fn register_counter(
            &self,
            key: &::metrics::Key,
            _: &::metrics::Metadata<'_>,
        ) -> ::metrics::Counter {
            if key.name() == "web_protocol_faults_total" {
                ::metrics::Counter::from_arc(self.faults.clone())
            } else {
                ::metrics::Counter::noop()
            }
        }

        fn register_gauge(
            &self,
            _: &::metrics::Key,
            _: &::metrics::Metadata<'_>,
        ) -> ::metrics::Gauge {
            ::metrics::Gauge::noop()
        }

        fn register_histogram(
            &self,
            _: &::metrics::Key,
            _: &::metrics::Metadata<'_>,
        ) -> ::metrics::Histogram {
            ::metrics::Histogram::noop()
        }
    }

    #[test]
    fn first_request_fault_is_counted() {
        let recorder = FaultRecorder {
            faults: Arc::default(),
        };
        let (mut server, _, _) = server(None);

        let result = ::metrics::with_local_recorder(&recorder, || {
            server.on_request_complete(request(
                b"GET /ws HTTP/1.1\r\nHost: a\r\nConnection: Upgrade\r\nUpgrade: websocket\r\n\r\n",
            ))
        });

        assert!(matches!(result, Err(ProtocolError::MissingWebSocketKey)));
        assert_eq!(recorder.faults.load(std::sync::atomic::Ordering::Relaxed), 1);
    }
}
