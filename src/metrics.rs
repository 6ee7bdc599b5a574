//! Metric helpers for `spoolhttp`.
//!
//! This module defines metric names and simple helper functions
//! wrapping the [`metrics`](https://docs.rs/metrics) crate. With the
//! `metrics` feature disabled the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking active connections.
pub const CONNECTIONS_ACTIVE: &str = "spoolhttp_connections_active";
/// Name of the counter tracking dispatched requests.
pub const REQUESTS_TOTAL: &str = "spoolhttp_requests_total";
/// Name of the counter tracking body bytes written to the sink.
pub const BODY_BYTES_SPOOLED: &str = "spoolhttp_body_bytes_spooled_total";
/// Name of the counter tracking error occurrences.
pub const ERRORS_TOTAL: &str = "spoolhttp_errors_total";

/// How a dispatched request ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The handler returned a response.
    Handled,
    /// The handler panicked and a `500` was sent instead.
    Panicked,
    /// The request never reached the handler.
    Abandoned,
}

impl Outcome {
    #[cfg(feature = "metrics")]
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Handled => "handled",
            Outcome::Panicked => "panicked",
            Outcome::Abandoned => "abandoned",
        }
    }
}

/// Increment the active connections gauge.
pub fn inc_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement the active connections gauge.
pub fn dec_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a parsed request and how it ended.
pub fn inc_requests(outcome: Outcome) {
    #[cfg(feature = "metrics")]
    counter!(REQUESTS_TOTAL, "outcome" => outcome.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = outcome;
}

/// Record `len` body bytes persisted to the sink.
pub fn add_body_bytes(len: usize) {
    #[cfg(feature = "metrics")]
    counter!(BODY_BYTES_SPOOLED).increment(len as u64);
    #[cfg(not(feature = "metrics"))]
    let _ = len;
}

/// Record an error occurrence.
pub fn inc_errors() {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL).increment(1);
}
