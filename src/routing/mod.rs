//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at connection setup):
//!     plugin.routes() → [(ProtocolKind, pattern string)]
//!     → matcher.rs (compile pattern, fail fast on bad regex)
//!     → router.rs (append to that kind's ordered list)
//!
//! First request:
//!     (ProtocolKind, path)
//!     → router.rs (scan that kind's list in registration order)
//!     → Return: owning PluginId or no match
//! ```
//!
//! # Design Decisions
//! - Routes compiled once per connection, immutable afterwards
//! - Each protocol kind has its own list; no fallback across kinds
//! - First match wins (registration order, no priorities)

pub mod matcher;
pub mod router;

pub use matcher::RoutePattern;
pub use router::{ProtocolKind, Route, RouteTable};
