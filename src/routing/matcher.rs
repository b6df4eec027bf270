//! Route pattern matching.
//!
//! # Responsibilities
//! - Compile plugin-declared regular expressions
//! - Match request paths against them
//!
//! # Design Decisions
//! - Patterns are anchored at the start of the path only, so `/ws` also
//!   matches `/ws/chat` and `/ws?room=1`
//! - Path matching is case-sensitive
//! - Matching runs against the raw request target, query string included

use regex::Regex;

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
}

impl RoutePattern {
    /// Compile `pattern`, anchoring it at the start of the path.
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{pattern})"))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Returns true if the path matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// The pattern as declared by the plugin.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}
