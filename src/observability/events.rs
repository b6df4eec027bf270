//! Structured event publishing.
//!
//! # Responsibilities
//! - Carry named events with a JSON payload to whoever drains the queue
//! - Never block or fail the publisher
//!
//! # Design Decisions
//! - Unbounded channel: `publish` is a push, never an await
//! - A dropped receiver only costs a debug log line

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

/// Published once the first request of a connection has been parsed.
pub const REQUEST_COMPLETE: &str = "request_complete";

/// A published event.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Connection the event belongs to.
    pub request_id: String,
    pub event_name: String,
    /// Seconds since the Unix epoch.
    pub event_timestamp: f64,
    pub event_payload: Value,
    /// Component that published the event.
    pub publisher_id: String,
}

/// Sending half of the event bus.
#[derive(Debug, Clone)]
pub struct EventQueue {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventQueue {
    /// Create a queue and the receiver events are delivered to.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Publish an event without waiting.
    pub fn publish(
        &self,
        request_id: impl Into<String>,
        event_name: &str,
        event_payload: Value,
        publisher_id: &str,
    ) {
        let event_timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        let event = Event {
            request_id: request_id.into(),
            event_name: event_name.to_string(),
            event_timestamp,
            event_payload,
            publisher_id: publisher_id.to_string(),
        };
        if self.tx.send(event).is_err() {
            tracing::debug!(event = event_name, "Event queue closed, dropping event");
        }
    }
}
