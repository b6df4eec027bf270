//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Raw client bytes
//!     → parser.rs (request line, headers, body; returns unconsumed tail)
//!     → request.rs (parsed request and header predicates)
//!     → server.rs (route, upgrade, static fallback, pipelining)
//!     → websocket.rs (handshake key, frame codec)
//!     → static_files.rs / response.rs (bytes queued on the client)
//! ```

pub mod parser;
pub mod request;
pub mod response;
pub mod server;
pub mod static_files;
pub mod websocket;

pub use parser::HttpParser;
pub use request::HttpRequest;
pub use response::{build_http_response, not_found_response};
pub use server::{DispatchState, HttpWebServer, RequestDisposition};
pub use websocket::{Opcode, WebsocketFrame};
