//! Connection handling for [`HttpServer`](super::HttpServer).
//!
//! One task runs per accepted socket. It reads chunks, feeds them to the
//! shared [`Reassembler`] and hands the parsed request to a dispatch task.
//! Reading continues while the dispatch task is parked on an incomplete
//! body; once the body completes (or the request fails) the response is
//! written and the socket is closed.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use bytes::BytesMut;
use futures::FutureExt;
use log::{debug, error, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    task::JoinHandle,
    time::timeout,
};
use tokio_util::task::TaskTracker;

use super::counter::ActiveConnection;
use crate::{
    config::ServerConfig,
    reassembler::{PendingRequest, Reassembler, Received},
    response::{Response, StatusCode},
    session::ConnectionId,
};

/// Per-connection settings derived from [`ServerConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Longest silence tolerated between reads.
    pub idle_timeout: Option<Duration>,
    /// Capacity reserved for each read.
    pub read_buffer_size: usize,
}

impl From<&ServerConfig> for ConnectionOptions {
    fn from(config: &ServerConfig) -> Self {
        Self {
            idle_timeout: config.idle_timeout,
            read_buffer_size: config.read_buffer_size.max(1),
        }
    }
}

impl Default for ConnectionOptions {
    fn default() -> Self { Self::from(&ServerConfig::default()) }
}

/// Spawn a task to serve a single TCP connection, logging and discarding any panics.
pub(super) fn spawn_connection_task(
    stream: TcpStream,
    peer_addr: SocketAddr,
    engine: Arc<Reassembler>,
    options: ConnectionOptions,
    tracker: &TaskTracker,
) {
    let id = ConnectionId::next();
    debug!("connection accepted: connection={id}, peer_addr={peer_addr}");
    tracker.spawn(async move {
        let fut = std::panic::AssertUnwindSafe(serve_connection(
            stream,
            id,
            Arc::clone(&engine),
            options,
        ))
        .catch_unwind();

        if let Err(panic) = fut.await {
            crate::metrics::inc_errors();
            engine.on_connection_closed(id).await;
            let panic_msg = crate::panic::format_panic(panic);
            // Emit via both `log` and `tracing` for tests that capture either.
            error!("connection task panicked: panic={panic_msg}, peer_addr={peer_addr}");
            tracing::error!(panic = %panic_msg, %peer_addr, "connection task panicked");
        }
    });
}

enum ReadOutcome {
    Data,
    Closed,
    Idle,
}

async fn read_chunk<S>(stream: &mut S, buf: &mut BytesMut, options: ConnectionOptions) -> ReadOutcome
where
    S: AsyncRead + Unpin,
{
    buf.clear();
    buf.reserve(options.read_buffer_size);
    let read = match options.idle_timeout {
        Some(limit) => match timeout(limit, stream.read_buf(buf)).await {
            Ok(read) => read,
            Err(_) => return ReadOutcome::Idle,
        },
        None => stream.read_buf(buf).await,
    };
    match read {
        Ok(0) => ReadOutcome::Closed,
        Ok(_) => ReadOutcome::Data,
        Err(e) => {
            debug!("read failed: error={e}");
            ReadOutcome::Closed
        }
    }
}

fn spawn_dispatch(
    engine: &Arc<Reassembler>,
    pending: PendingRequest,
) -> JoinHandle<Option<Response>> {
    let engine = Arc::clone(engine);
    tokio::spawn(async move { engine.dispatch(pending).await })
}

/// Serve one connection until its request has been answered or it closes.
///
/// `stream` may be any duplex byte stream; the server passes accepted
/// [`TcpStream`]s. Each call must use a distinct `id`.
pub async fn serve_connection<S>(
    mut stream: S,
    id: ConnectionId,
    engine: Arc<Reassembler>,
    options: ConnectionOptions,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let _guard = ActiveConnection::new();
    let mut buf = BytesMut::with_capacity(options.read_buffer_size);
    let mut dispatch: Option<JoinHandle<Option<Response>>> = None;
    let mut immediate: Option<Response> = None;

    loop {
        match read_chunk(&mut stream, &mut buf, options).await {
            ReadOutcome::Data => {}
            ReadOutcome::Closed => {
                engine.on_connection_closed(id).await;
                break;
            }
            ReadOutcome::Idle => {
                debug!("connection idle: connection={id}");
                if dispatch.is_none() || !engine.expire(id).await {
                    engine.on_connection_closed(id).await;
                    immediate = Some(Response::status_only(StatusCode::REQUEST_TIMEOUT));
                }
                break;
            }
        }

        match engine.on_bytes(id, &buf).await {
            Ok(Received::Pending) => {}
            Ok(Received::Suspended(pending)) => dispatch = Some(spawn_dispatch(&engine, pending)),
            Ok(Received::Ready(pending)) => {
                dispatch = Some(spawn_dispatch(&engine, pending));
                break;
            }
            Ok(Received::Resumed) => break,
            Err(e) => {
                immediate = e.status().map(Response::status_only);
                break;
            }
        }
    }

    let response = match dispatch {
        Some(task) => match task.await {
            Ok(response) => response,
            Err(e) => {
                warn!("dispatch task failed: connection={id}, error={e}");
                Some(Response::status_only(StatusCode::INTERNAL_SERVER_ERROR))
            }
        },
        None => None,
    }
    .or(immediate);

    if let Some(response) = response {
        if let Err(e) = write_response(&mut stream, &response).await {
            debug!("failed to write response: connection={id}, error={e}");
        } else {
            debug!(
                "response sent: connection={id}, status={}",
                response.status().as_u16()
            );
        }
    }
    if let Err(e) = stream.shutdown().await {
        debug!("failed to shut down connection: connection={id}, error={e}");
        tracing::debug!(connection = %id, error = %e, "failed to shut down connection");
    }
}

async fn write_response<S>(stream: &mut S, response: &Response) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(&response.encode()).await?;
    stream.flush().await
}
