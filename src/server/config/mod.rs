//! Builder methods for [`HttpServer`].

use std::{sync::Arc, time::Duration};

use tokio::sync::oneshot;

use super::{BackoffConfig, HttpServer, ServerState, Unbound};
use crate::{
    config::ServerConfig,
    handler::RequestHandler,
    sink::{ByteSink, MemorySink},
};

pub mod binding;


impl HttpServer<Unbound> {
    /// Create a server dispatching every request to `handler`.
    ///
    /// Bodies are spooled to a [`MemorySink`] until [`sink`](Self::sink)
    /// selects another one. The worker count defaults to the number of
    /// available CPU cores (or 1 if this cannot be determined).
    ///
    /// # Examples
    ///
    /// ```
    /// use spoolhttp::{handler::EchoHandler, server::HttpServer};
    ///
    /// let server = HttpServer::new(EchoHandler);
    /// assert!(server.worker_count() >= 1);
    /// ```
    #[must_use]
    pub fn new(handler: impl RequestHandler) -> Self {
        let workers = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Self {
            handler: Arc::new(handler),
            sink: Arc::new(MemorySink::new()),
            config: ServerConfig::default(),
            workers,
            ready_tx: None,
            state: Unbound,
        }
    }
}

impl<S: ServerState> HttpServer<S> {
    /// Set the number of worker tasks to spawn for the server.
    #[must_use]
    pub fn workers(mut self, count: usize) -> Self {
        self.workers = count.max(1);
        self
    }

    /// Spool request bodies to `sink`.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn ByteSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the whole connection configuration.
    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the idle timeout; `None` or zero disables it.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config = self.config.idle_timeout(timeout);
        self
    }

    /// Configure accept-loop back-off.
    #[must_use]
    pub fn accept_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.config = self.config.backoff(backoff);
        self
    }

    /// Configure a channel used to signal when the server is ready to accept connections.
    #[must_use]
    pub fn ready_signal(mut self, tx: oneshot::Sender<()>) -> Self {
        self.ready_tx = Some(tx);
        self
    }

    /// Returns the configured number of worker tasks for the server.
    #[inline]
    #[must_use]
    pub const fn worker_count(&self) -> usize { self.workers }

    /// Returns the connection configuration.
    #[must_use]
    pub const fn server_config(&self) -> &ServerConfig { &self.config }

    /// Returns the byte sink shared by all connections.
    #[must_use]
    pub fn byte_sink(&self) -> Arc<dyn ByteSink> { Arc::clone(&self.sink) }
}
