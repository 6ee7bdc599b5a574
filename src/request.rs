//! Fully received requests as seen by handlers.
//!
//! A [`Request`] carries the parsed head and a reference to the spooled
//! body rather than the body itself. Handlers read the body from the sink
//! while they run; the sink is released as soon as the handler returns.
//!
//! ```no_run
//! use spoolhttp::{
//!     request::Request,
//!     response::{Response, StatusCode},
//! };
//!
//! async fn count_bytes(request: Request) -> Response {
//!     match request.body().await {
//!         Ok(body) => Response::new(StatusCode::OK).body(body.len().to_string()),
//!         Err(_) => Response::status_only(StatusCode::INTERNAL_SERVER_ERROR),
//!     }
//! }
//! ```

use std::{io, pin::Pin, sync::Arc};

use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio::io::{AsyncReadExt, Take};
use tokio_util::io::ReaderStream;

use crate::{
    framer::{Headers, RequestHead},
    payload::{self, Payload},
    session::ConnectionId,
    sink::{ByteSink, SinkReader},
};

/// Streaming request body.
pub type RequestBodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send + 'static>>;

/// Location of a request body: the first `len` bytes spooled for
/// `connection`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BodyRef {
    /// Connection whose sink holds the body.
    pub connection: ConnectionId,
    /// Body length in bytes.
    pub len: u64,
}

/// A complete request handed to a [`RequestHandler`](crate::handler::RequestHandler).
#[derive(Clone)]
pub struct Request {
    head: RequestHead,
    body: BodyRef,
    sink: Arc<dyn ByteSink>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("head", &self.head)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

impl Request {
    pub(crate) fn new(head: RequestHead, body: BodyRef, sink: Arc<dyn ByteSink>) -> Self {
        Self { head, body, sink }
    }

    /// Upper-cased request method.
    #[must_use]
    pub fn method(&self) -> &str { &self.head.method }

    /// Request target as sent by the client.
    #[must_use]
    pub fn uri(&self) -> &str { &self.head.uri }

    /// Protocol version token.
    #[must_use]
    pub fn version(&self) -> &str { &self.head.version }

    /// Header fields.
    #[must_use]
    pub fn headers(&self) -> &Headers { &self.head.headers }

    /// The full parsed head.
    #[must_use]
    pub fn head(&self) -> &RequestHead { &self.head }

    /// Where the body lives.
    #[must_use]
    pub fn body_ref(&self) -> BodyRef { self.body }

    /// Connection the request arrived on.
    #[must_use]
    pub fn connection(&self) -> ConnectionId { self.body.connection }

    /// Reader limited to the body bytes.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the sink cannot be opened.
    pub async fn body_reader(&self) -> io::Result<Take<SinkReader>> {
        if self.body.len == 0 {
            return Ok(empty_reader());
        }
        let reader = self.sink.read(self.body.connection).await?;
        Ok(reader.take(self.body.len))
    }

    /// Body as a stream of chunks.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the sink cannot be opened.
    pub async fn body_stream(&self) -> io::Result<RequestBodyStream> {
        Ok(Box::pin(ReaderStream::new(self.body_reader().await?)))
    }

    /// Read the whole body into memory.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the sink cannot be read or holds fewer
    /// bytes than declared.
    pub async fn body(&self) -> io::Result<Bytes> {
        let capacity = usize::try_from(self.body.len).unwrap_or(usize::MAX).min(1 << 20);
        let mut buf = BytesMut::with_capacity(capacity);
        let mut reader = self.body_reader().await?;
        while reader.read_buf(&mut buf).await? != 0 {}
        if (buf.len() as u64) < self.body.len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "spooled body shorter than declared: {} < {}",
                    buf.len(),
                    self.body.len
                ),
            ));
        }
        Ok(buf.freeze())
    }

    /// Read and decode the body according to its `Content-Type`.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the body cannot be read.
    pub async fn payload(&self) -> io::Result<Payload> {
        let body = self.body().await?;
        Ok(payload::decode(self.head.content_type(), body))
    }
}

fn empty_reader() -> Take<SinkReader> {
    let empty: SinkReader = Box::new(tokio::io::empty());
    empty.take(0)
}
