//! Attaching an [`HttpServer`] to the TCP listener its workers accept
//! uploads from.
//!
//! Binding converts the server from [`Unbound`] to [`Bound`]. A bound
//! server may be pointed at another listener before it runs; the handler,
//! byte sink and limits carry over unchanged.

use std::{
    net::{SocketAddr, TcpListener as StdTcpListener},
    sync::Arc,
};

use tokio::net::TcpListener;

use super::super::{Bound, HttpServer, ServerError, ServerState, Unbound};

/// Register `std_listener` with the Tokio reactor.
///
/// Must be called from within a Tokio runtime.
fn into_tokio_listener(std_listener: StdTcpListener) -> Result<TcpListener, ServerError> {
    std_listener
        .set_nonblocking(true)
        .map_err(ServerError::Bind)?;
    TcpListener::from_std(std_listener).map_err(ServerError::Bind)
}

impl<S: ServerState> HttpServer<S> {
    fn attach(self, std_listener: StdTcpListener) -> Result<HttpServer<Bound>, ServerError> {
        let listener = into_tokio_listener(std_listener)?;
        let HttpServer {
            handler,
            sink,
            config,
            workers,
            ready_tx,
            ..
        } = self;
        Ok(HttpServer {
            handler,
            sink,
            config,
            workers,
            ready_tx,
            state: Bound {
                listener: Arc::new(listener),
            },
        })
    }
}

impl HttpServer<Unbound> {
    /// An unbound server has no address to report.
    ///
    /// # Examples
    ///
    /// ```
    /// use spoolhttp::{handler::EchoHandler, server::HttpServer};
    ///
    /// assert!(HttpServer::new(EchoHandler).local_addr().is_none());
    /// ```
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> { None }

    /// Listen for HTTP clients on `addr`.
    ///
    /// Port `0` picks a free port; read it back with
    /// [`HttpServer::local_addr`]. Must be called inside a Tokio runtime.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::net::{Ipv4Addr, SocketAddr};
    ///
    /// use spoolhttp::{handler::EchoHandler, server::HttpServer};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), spoolhttp::server::ServerError> {
    /// let server = HttpServer::new(EchoHandler).bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))?;
    /// assert!(server.local_addr().is_some_and(|addr| addr.port() != 0));
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub fn bind(self, addr: SocketAddr) -> Result<HttpServer<Bound>, ServerError> {
        let std_listener = StdTcpListener::bind(addr).map_err(ServerError::Bind)?;
        self.attach(std_listener)
    }

    /// Accept HTTP clients from a listener bound elsewhere, such as one
    /// handed over by a supervisor or reserved by a test.
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] if the listener cannot be registered
    /// with the runtime.
    pub fn bind_existing_listener(
        self,
        std_listener: StdTcpListener,
    ) -> Result<HttpServer<Bound>, ServerError> {
        self.attach(std_listener)
    }
}

impl HttpServer<Bound> {
    /// Address clients should connect to, or `None` if the socket cannot
    /// report it.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> { self.state.listener.local_addr().ok() }

    /// Move to a new address before running. The previous listener is
    /// closed.
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub fn bind(self, addr: SocketAddr) -> Result<Self, ServerError> {
        let std_listener = StdTcpListener::bind(addr).map_err(ServerError::Bind)?;
        self.attach(std_listener)
    }

    /// Move to a listener bound elsewhere. The previous listener is closed.
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] if the listener cannot be registered
    /// with the runtime.
    pub fn bind_existing_listener(self, std_listener: StdTcpListener) -> Result<Self, ServerError> {
        self.attach(std_listener)
    }
}
