//! Plugins shipped with the binary.

use http::StatusCode;

use crate::http::{build_http_response, HttpRequest, Opcode, WebsocketFrame};
use crate::net::ClientConnection;
use crate::plugin::{PluginCatalog, PluginContext, WebServerPlugin};
use crate::routing::ProtocolKind;

pub const ROUTE_EXAMPLE: &str = "route_example";

/// Answers `/http-route-example` and echoes frames on `/ws-route-example`.
#[derive(Debug)]
pub struct RouteExamplePlugin {
    client: ClientConnection,
}

impl RouteExamplePlugin {
    pub fn new(context: PluginContext) -> Self {
        Self {
            client: context.client,
        }
    }
}

impl WebServerPlugin for RouteExamplePlugin {
    fn name(&self) -> &str {
        ROUTE_EXAMPLE
    }

    fn routes(&self) -> Vec<(ProtocolKind, String)> {
        vec![
            (ProtocolKind::PlainHttp, "/http-route-example$".into()),
            (ProtocolKind::EncryptedHttp, "/https-route-example$".into()),
            (ProtocolKind::WebSocket, "/ws-route-example$".into()),
        ]
    }

    fn handle_request(&mut self, request: &HttpRequest) {
        let body = format!("{} route response", request.path().trim_start_matches('/'));
        self.client.queue(build_http_response(
            StatusCode::OK,
            "OK",
            &[("Content-Type", "text/plain")],
            Some(body.as_bytes()),
        ));
    }

    fn on_websocket_message(&mut self, frame: &WebsocketFrame) {
        let opcode = match frame.opcode() {
            Some(Opcode::Ping) => Opcode::Pong,
            Some(Opcode::Binary) => Opcode::Binary,
            Some(Opcode::Text) => Opcode::Text,
            _ => return,
        };
        self.client.queue(WebsocketFrame::build(opcode, frame.payload()));
    }
}

/// Catalog holding every built-in plugin.
pub fn builtin_catalog() -> PluginCatalog {
    let mut catalog = PluginCatalog::new();
    catalog.register(ROUTE_EXAMPLE, |context| {
        Box::new(RouteExamplePlugin::new(context))
    });
    catalog
}
