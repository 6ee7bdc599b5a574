//! Server configuration.
//!
//! [`ServerConfig`] gathers the per-connection knobs of an
//! [`HttpServer`](crate::server::HttpServer): idle timeout, read buffer size,
//! reassembly limits and accept-loop back-off.

use std::time::Duration;

use crate::{reassembler::Limits, server::BackoffConfig};

/// Default time a connection may stay silent before it is answered with
/// `408 Request Time-out` and closed.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
/// Default capacity of the per-read buffer.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Tunables applied to every connection.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use spoolhttp::config::ServerConfig;
///
/// let config = ServerConfig::default()
///     .idle_timeout(None)
///     .max_body_bytes(Some(1 << 30));
/// assert_eq!(config.idle_timeout, None);
/// assert_eq!(config.limits.max_body_bytes, Some(1 << 30));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Longest silence tolerated between reads; `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// Capacity reserved for each socket read.
    pub read_buffer_size: usize,
    /// Head and body size limits.
    pub limits: Limits,
    /// Retry timing for failed `accept()` calls.
    pub backoff: BackoffConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            limits: Limits::default(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Set the idle timeout. A zero duration is treated as `None`.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout.filter(|d| !d.is_zero());
        self
    }

    /// Set the read buffer capacity, at least one byte.
    #[must_use]
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    /// Set the largest accepted request head.
    #[must_use]
    pub fn max_head_bytes(mut self, limit: usize) -> Self {
        self.limits.max_head_bytes = limit;
        self
    }

    /// Set the largest accepted `Content-Length`.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: Option<u64>) -> Self {
        self.limits.max_body_bytes = limit;
        self
    }

    /// Set the accept-loop back-off.
    #[must_use]
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff.normalized();
        self
    }
}
