//! Active connection counting and RAII guard.

use std::sync::atomic::{AtomicU64, Ordering};

static ACTIVE_CONNECTIONS: AtomicU64 = AtomicU64::new(0);

/// Held for the lifetime of a connection task; keeps the process-wide count
/// and the `spoolhttp_connections_active` gauge in step.
pub(super) struct ActiveConnection;

impl ActiveConnection {
    pub(super) fn new() -> Self {
        ACTIVE_CONNECTIONS.fetch_add(1, Ordering::Relaxed);
        crate::metrics::inc_connections();
        Self
    }
}

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        ACTIVE_CONNECTIONS.fetch_sub(1, Ordering::Relaxed);
        crate::metrics::dec_connections();
    }
}

/// Number of connections currently being served by this process.
#[must_use]
pub fn active_connection_count() -> u64 { ACTIVE_CONNECTIONS.load(Ordering::Relaxed) }
