//! Tokio-based HTTP server.
//!
//! `HttpServer` spawns worker tasks that accept TCP connections. Each
//! connection gets a fresh [`ConnectionId`](crate::session::ConnectionId) and
//! a task that feeds received chunks to the shared
//! [`Reassembler`](crate::reassembler::Reassembler), dispatches the request
//! to the [`RequestHandler`] once its body is spooled and writes the response.

use std::sync::Arc;

use tokio::{net::TcpListener, sync::oneshot};

use crate::{config::ServerConfig, handler::RequestHandler, sink::ByteSink};

/// Tokio-based HTTP server.
///
/// The server carries a typestate `S` indicating whether it is
/// [`Unbound`] (not yet bound to a TCP listener) or [`Bound`]. New servers
/// start `Unbound` and must call [`HttpServer::bind`] or
/// [`HttpServer::bind_existing_listener`] before running. All workers share
/// one handler, one byte sink and one connection state store.
pub struct HttpServer<S = Unbound>
where
    S: ServerState,
{
    pub(crate) handler: Arc<dyn RequestHandler>,
    pub(crate) sink: Arc<dyn ByteSink>,
    pub(crate) config: ServerConfig,
    pub(crate) workers: usize,
    /// Channel used to notify when the server is ready.
    ///
    /// A `oneshot::Sender` can transmit only one readiness notification, so a
    /// new sender must be provided each time the server is started.
    pub(crate) ready_tx: Option<oneshot::Sender<()>>,
    /// Typestate tracking whether the server has been bound to a listener.
    pub(crate) state: S,
}

impl<S: ServerState + std::fmt::Debug> std::fmt::Debug for HttpServer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServer")
            .field("config", &self.config)
            .field("workers", &self.workers)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Marker indicating the server has not yet bound a listener.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbound;

/// Marker indicating the server is bound to a TCP listener.
#[derive(Debug, Clone)]
pub struct Bound {
    pub(crate) listener: Arc<TcpListener>,
}

/// Trait implemented by [`Unbound`] and [`Bound`] to model binding typestate.
pub trait ServerState: sealed::Sealed {}

mod sealed {
    //! Prevent external implementations of [`ServerState`].

    pub trait Sealed {}
    impl Sealed for super::Unbound {}
    impl Sealed for super::Bound {}
}

impl ServerState for Unbound {}
impl ServerState for Bound {}

mod config;
pub use config::binding;
mod connection;
mod counter;
pub mod error;
mod runtime;

pub use connection::serve_connection;
pub use counter::active_connection_count;
pub use error::ServerError;
/// Re-exported configuration types for server backoff behavior.
pub use runtime::BackoffConfig;

#[cfg(test)]
pub(crate) mod test_util;
