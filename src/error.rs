//! Connection-fatal error definitions.
//!
//! Routing misses never show up here: they are answered with a static file or
//! a 404 and are ordinary control flow. Everything in [`ProtocolError`] means
//! the event loop must tear the connection down immediately.

use thiserror::Error;

/// A fatal, connection-terminating fault.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The WebSocket client sent a close frame.
    #[error("client sent connection close packet")]
    ClientClosed,

    /// A pipelined request completed without HTTP/1.1 keep-alive.
    #[error("pipelined request is not keep-alive, tearing down connection")]
    PipelineNotKeepAlive,

    /// The client sent bytes that do not form a valid HTTP request.
    #[error("malformed HTTP request: {0}")]
    MalformedRequest(#[from] httparse::Error),

    /// The request head is well formed but its framing is unusable.
    #[error("invalid HTTP request framing: {0}")]
    InvalidFraming(&'static str),

    /// The client sent bytes that do not form a valid WebSocket frame.
    #[error("malformed WebSocket frame: {0}")]
    MalformedFrame(&'static str),

    /// An upgrade was requested without a `Sec-WebSocket-Key` header.
    #[error("websocket upgrade requested without Sec-WebSocket-Key")]
    MissingWebSocketKey,
}

impl ProtocolError {
    /// Whether this fault is the expected end of a WebSocket session.
    pub fn is_client_close(&self) -> bool {
        matches!(self, ProtocolError::ClientClosed)
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProtocolError::ClientClosed => "client_closed",
            ProtocolError::PipelineNotKeepAlive => "pipeline_not_keep_alive",
            ProtocolError::MalformedRequest(_) | ProtocolError::InvalidFraming(_) => "malformed_request",
            ProtocolError::MalformedFrame(_) => "malformed_frame",
            ProtocolError::MissingWebSocketKey => "missing_websocket_key",
        }
    }
}
