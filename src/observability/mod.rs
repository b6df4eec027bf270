//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! HttpWebServer produces:
//!     → events.rs (request_complete events on a non-blocking queue)
//!     → access_log.rs (one formatted line per connection)
//!     → metrics.rs (dispatch outcomes and byte counters)
//!     → logging.rs (tracing subscriber the above write through)
//! ```
//!
//! # Design Decisions
//! - Structured logging via `tracing`, JSON optional
//! - Connection ID flows through every log line and event
//! - Event publishing never blocks the request path
//! - Metrics are cheap (no-ops until a recorder is installed)

pub mod access_log;
pub mod events;
pub mod logging;
pub mod metrics;

pub use access_log::{format_access_log, AccessLogContext};
pub use events::{Event, EventQueue};
