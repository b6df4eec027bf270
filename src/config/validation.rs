//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check plugin names and access log format are usable
//! - Check static server and TLS paths are non-empty
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: WebServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::WebServerConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("plugins[{0}] has an empty name")]
    EmptyPluginName(usize),

    #[error("access_log.format has an unbalanced brace at byte {0}")]
    UnbalancedBrace(usize),

    #[error("static_server.root_dir must be set when static serving is enabled")]
    EmptyStaticRoot,

    #[error("tls.{0} must not be empty")]
    EmptyTlsPath(&'static str),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &WebServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (index, name) in config.plugins.iter().enumerate() {
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptyPluginName(index));
        }
    }

    if let Some(offset) = unbalanced_brace(&config.access_log.format) {
        errors.push(ValidationError::UnbalancedBrace(offset));
    }

    if config.static_server.enabled && config.static_server.root_dir.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyStaticRoot);
    }

    if let Some(tls) = &config.tls {
        if tls.cert_path.as_os_str().is_empty() {
            errors.push(ValidationError::EmptyTlsPath("cert_path"));
        }
        if tls.key_path.as_os_str().is_empty() {
            errors.push(ValidationError::EmptyTlsPath("key_path"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Offset of the first brace that does not open or close a placeholder.
/// Outside a placeholder `{{` and `}}` are literal braces.
fn unbalanced_brace(format: &str) -> Option<usize> {
    let mut open: Option<usize> = None;
    let mut chars = format.char_indices().peekable();
    while let Some((offset, ch)) = chars.next() {
        match (ch, open) {
            ('{' | '}', None) if chars.peek().map(|&(_, next)| next) == Some(ch) => {
                chars.next();
            }
            ('{', None) => open = Some(offset),
            ('{', Some(start)) => return Some(start),
            ('}', Some(_)) => open = None,
            ('}', None) => return Some(offset),
            _ => {}
        }
    }
    open
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TlsConfig;
    use std::path::PathBuf;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&WebServerConfig::default()).is_ok());
    }

    #[test]
    fn reports_every_problem() {
        let mut config = WebServerConfig::default();
        config.plugins = vec!["ok".into(), " ".into()];
        config.access_log.format = "{client_ip".into();
        config.static_server.enabled = true;
        config.static_server.root_dir = PathBuf::new();
        config.tls = Some(TlsConfig {
            cert_path: PathBuf::new(),
            key_path: PathBuf::from("key.pem"),
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyPluginName(1),
                ValidationError::UnbalancedBrace(0),
                ValidationError::EmptyStaticRoot,
                ValidationError::EmptyTlsPath("cert_path"),
            ]
        );
    }

    #[test]
    fn brace_scanner() {
        assert_eq!(unbalanced_brace("{a} - {b}"), None);
        assert_eq!(unbalanced_brace("{a}}"), Some(3));
        assert_eq!(unbalanced_brace("{a{b}"), Some(0));
        assert_eq!(unbalanced_brace("plain"), None);
    }

    #[test]
    fn doubled_braces_are_literal() {
        assert_eq!(unbalanced_brace("{{\"path\": \"{request_path}\"}}"), None);
        assert_eq!(unbalanced_brace("{{a}"), Some(3));
        assert_eq!(unbalanced_brace("}}{x}{{"), None);

        let mut config = WebServerConfig::default();
        config.access_log.format = "{{\"ip\": \"{client_ip}\"}}".into();
        assert!(validate_config(&config).is_ok());
    }
}
