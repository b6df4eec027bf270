//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → WebServerConfig (validated, immutable)
//!     → shared via Arc with every connection handler and plugin
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Route patterns are compiled per connection, so a bad pattern surfaces
//!   as a [`ConfigError::InvalidPattern`] at connection setup

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::AccessLogConfig;
pub use schema::EventsConfig;
pub use schema::LoggingConfig;
pub use schema::StaticServerConfig;
pub use schema::TlsConfig;
pub use schema::WebServerConfig;
