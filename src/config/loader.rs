//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::WebServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading and connection setup.
///
/// Every variant is fatal: it surfaces to the operator and is never handled
/// per request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// A plugin declared a route pattern that does not compile.
    #[error("plugin {plugin:?} declared invalid route pattern {pattern:?}: {source}")]
    InvalidPattern {
        plugin: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The config names a plugin the catalog does not know.
    #[error("unknown plugin: {0}")]
    UnknownPlugin(String),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<WebServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML document.
pub fn parse_config(content: &str) -> Result<WebServerConfig, ConfigError> {
    let config: WebServerConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
