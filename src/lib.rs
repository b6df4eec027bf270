//! Embedded web server dispatch for an intercepting proxy.

pub mod config;
pub mod error;
pub mod http;
pub mod net;
pub mod observability;
pub mod plugin;
pub mod routing;

pub use config::WebServerConfig;
pub use error::ProtocolError;
pub use crate::http::HttpWebServer;
pub use plugin::{PluginCatalog, PluginContext, WebServerPlugin};
