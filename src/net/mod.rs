//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Established client connection (accepted by the embedding event loop)
//!     → connection.rs (identity, remote address, outbound write queue)
//!     → descriptors.rs (readiness interest shared with plugins)
//!     → pool.rs (idle upstream connections plugins may reuse)
//!     → Hand off to HttpWebServer
//! ```
//!
//! # Design Decisions
//! - Accepting, TLS and socket I/O belong to the event loop, not this crate
//! - Handles are cheap clones so plugins and the dispatcher share one queue
//! - Nothing here blocks; flushing the queue is the event loop's job

pub mod connection;
pub mod descriptors;
pub mod pool;

pub use connection::{ClientConnection, ConnectionId};
pub use descriptors::{Descriptor, Descriptors};
pub use pool::UpstreamPool;
