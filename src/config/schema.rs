//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the embedded
//! web server. All types derive Serde traits for deserialization from config
//! files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default access log line, every field is a `{name}` substitution.
pub const DEFAULT_ACCESS_LOG_FORMAT: &str =
    "{client_ip}:{client_port} - {request_method} {request_path} - {request_ua} - {connection_time_ms}ms";

/// Default `Server` header value on generated responses.
pub const DEFAULT_SERVER_AGENT: &str = concat!("web-dispatch/v", env!("CARGO_PKG_VERSION"));

/// Root configuration for the embedded web server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebServerConfig {
    /// Names of catalog plugins to install on every connection, in
    /// registration order.
    pub plugins: Vec<String>,

    /// Optional TLS configuration. When present, connections are treated as
    /// encryption-terminated.
    pub tls: Option<TlsConfig>,

    /// Static file serving for requests no plugin claims.
    pub static_server: StaticServerConfig,

    /// Structured event publishing.
    pub events: EventsConfig,

    /// Access log settings.
    pub access_log: AccessLogConfig,

    /// Logging settings.
    pub logging: LoggingConfig,

    /// Value of the `Server` header on generated responses.
    pub server_agent: String,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            plugins: Vec::new(),
            tls: None,
            static_server: StaticServerConfig::default(),
            events: EventsConfig::default(),
            access_log: AccessLogConfig::default(),
            logging: LoggingConfig::default(),
            server_agent: DEFAULT_SERVER_AGENT.to_string(),
        }
    }
}

impl WebServerConfig {
    /// Whether connections run under encryption termination.
    pub fn encryption_enabled(&self) -> bool {
        self.tls.is_some()
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,
}

/// Static file server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticServerConfig {
    /// Serve files for unrouted requests instead of a bare 404.
    pub enabled: bool,

    /// Directory files are served from.
    pub root_dir: PathBuf,

    /// Minimum body length (bytes) before a response is gzipped.
    pub min_compression_length: usize,
}

impl Default for StaticServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            root_dir: PathBuf::from("public"),
            min_compression_length: 20,
        }
    }
}

/// Event publishing configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Publish a `request_complete` event for every first request.
    pub enabled: bool,
}

/// Access log configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessLogConfig {
    /// Line format with `{field}` substitutions.
    pub format: String,
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_ACCESS_LOG_FORMAT.to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,

    /// Emit JSON lines instead of the human readable format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "web_dispatch=info".to_string(),
            json: false,
        }
    }
}
