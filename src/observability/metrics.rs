//! Metrics collection.
//!
//! # Metrics
//! - `web_requests_total` (counter): first requests by dispatch outcome
//! - `web_request_bytes_total` (counter): inbound bytes per closed connection
//! - `web_response_bytes_total` (counter): outbound bytes per closed connection
//! - `web_protocol_faults_total` (counter): connections torn down by a fault
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; the embedding process installs
//!   whichever exporter it wants
//! - Labels are low cardinality (outcome names only)

/// How the first request of a connection was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Routed,
    Upgraded,
    Static,
    NotFound,
}

impl DispatchOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            DispatchOutcome::Routed => "routed",
            DispatchOutcome::Upgraded => "upgraded",
            DispatchOutcome::Static => "static",
            DispatchOutcome::NotFound => "not_found",
        }
    }
}

/// Count one dispatched first request.
pub fn record_dispatch(outcome: DispatchOutcome) {
    ::metrics::counter!("web_requests_total", "outcome" => outcome.as_str()).increment(1);
}

/// Add a closed connection's byte totals.
pub fn record_connection_bytes(request_bytes: u64, response_bytes: u64) {
    ::metrics::counter!("web_request_bytes_total").increment(request_bytes);
    ::metrics::counter!("web_response_bytes_total").increment(response_bytes);
}

/// Count one connection-fatal protocol fault.
pub fn record_protocol_fault(kind: &'static str) {
    ::metrics::counter!("web_protocol_faults_total", "kind" => kind).increment(1);
}
