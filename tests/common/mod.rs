//! Shared utilities for integration tests.
//!
//! Provides a listener bound to an unused local port and helpers to run a
//! server in the background and talk raw HTTP to it.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::{
    net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener},
    time::Duration,
};

use spoolhttp::server::{Bound, HttpServer, ServerError};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::oneshot,
    task::JoinHandle,
    time::{sleep, timeout},
};

/// Create a TCP listener bound to a free local port.
#[expect(
    clippy::expect_used,
    reason = "binding to an ephemeral localhost port must abort the test immediately"
)]
pub fn unused_listener() -> StdTcpListener {
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    StdTcpListener::bind(addr).expect("failed to bind port")
}

/// A server running on a background task.
pub struct RunningServer {
    pub addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), ServerError>>,
}

impl RunningServer {
    /// Start `server` and wait until its workers accept connections.
    pub async fn start(server: HttpServer<Bound>) -> Self {
        let addr = server.local_addr().expect("bound address");
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop, stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.ready_signal(ready_tx).run_with_shutdown(async {
            let _ = stop_rx.await;
        }));
        ready_rx.await.expect("server ready");
        Self { addr, stop, handle }
    }

    /// Signal shutdown and wait for in-flight connections to drain.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server stopped in time")
            .expect("server join error")
            .expect("server run failed");
    }
}

/// Send `chunks` as separate writes, pausing between them, then read the
/// whole reply until the server closes the connection.
pub async fn exchange(addr: SocketAddr, chunks: &[&[u8]], pause: Duration) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream.set_nodelay(true).expect("nodelay");
    for (i, chunk) in chunks.iter().enumerate() {
        if i > 0 && !pause.is_zero() {
            sleep(pause).await;
        }
        stream.write_all(chunk).await.expect("write chunk");
    }
    read_reply(&mut stream).await
}

/// Read until EOF and return the reply as text.
pub async fn read_reply(stream: &mut TcpStream) -> String {
    let mut out = Vec::new();
    timeout(Duration::from_secs(5), stream.read_to_end(&mut out))
        .await
        .expect("reply in time")
        .expect("read reply");
    String::from_utf8_lossy(&out).into_owned()
}

/// Split a reply into its head and body.
pub fn split_reply(reply: &str) -> (&str, &str) {
    reply.split_once("\r\n\r\n").expect("reply has a head")
}
