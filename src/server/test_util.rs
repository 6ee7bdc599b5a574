//! Test helpers shared across server modules.

use std::net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener};

use rstest::fixture;

use super::{Bound, HttpServer};
use crate::{
    handler::{RequestHandler, handler_fn},
    request::Request,
    response::{Response, StatusCode},
};

/// Handler that replies `200` with the request body.
#[fixture]
pub fn echo_body() -> impl RequestHandler {
    handler_fn(|request: Request| async move {
        match request.body().await {
            Ok(body) => Response::new(StatusCode::OK).body(body),
            Err(_) => Response::status_only(StatusCode::INTERNAL_SERVER_ERROR),
        }
    })
}

#[fixture]
/// Returns a bound [`StdTcpListener`] on a free port for use in tests.
///
/// Keeping the listener bound prevents race conditions where another
/// process could claim the port between discovery and use.
pub fn free_listener() -> StdTcpListener {
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    StdTcpListener::bind(addr).expect("Failed to bind free port listener")
}

/// Extract the bound address from a listener.
#[must_use]
pub fn listener_addr(listener: &StdTcpListener) -> SocketAddr {
    listener
        .local_addr()
        .expect("failed to get listener address")
}

pub fn bind_server(handler: impl RequestHandler, listener: StdTcpListener) -> HttpServer<Bound> {
    HttpServer::new(handler)
        .bind_existing_listener(listener)
        .expect("Failed to bind")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_addr_matches_local_addr() {
        let listener = free_listener();
        assert_eq!(
            listener_addr(&listener),
            listener.local_addr().expect("failed to get address")
        );
    }

    #[test]
    fn free_listener_uses_localhost() {
        let addr = listener_addr(&free_listener());
        assert_eq!(addr.ip(), std::net::IpAddr::from(Ipv4Addr::LOCALHOST));
    }
}
