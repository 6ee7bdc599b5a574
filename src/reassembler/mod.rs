//! Request reassembly across arbitrarily split receive events.
//!
//! The [`Reassembler`] is driven by a connection's receive loop. Every
//! chunk read from the socket is passed to [`Reassembler::on_bytes`], which
//! advances the connection's [`ParseState`]:
//!
//! * bytes accumulate until the head terminator has been seen;
//! * the head is parsed and any trailing bytes are spooled to the
//!   [`ByteSink`];
//! * later chunks are spooled until the declared `Content-Length` has been
//!   persisted.
//!
//! Once the head is parsed the caller receives a [`PendingRequest`] which it
//! runs on its own task with [`Reassembler::dispatch`]. If the body is still
//! incomplete the request task parks until the receive event that completes
//! the body resumes it. The handler therefore never observes a partially
//! spooled body.

mod error;
mod state;
mod suspend;


use std::{panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use log::{debug, error, warn};

pub use self::{
    error::RequestError,
    state::{ParseState, Phase},
    suspend::{Parked, SuspensionToken},
};
use self::suspend::suspend;
use crate::{
    handler::RequestHandler,
    metrics::{self, Outcome},
    panic::format_panic,
    request::{BodyRef, Request},
    response::{Response, StatusCode},
    session::{ConnectionId, ConnectionStore},
    sink::ByteSink,
};

/// Default upper bound on the size of a request head.
pub const DEFAULT_MAX_HEAD_BYTES: usize = 64 * 1024;

/// Size limits enforced while reassembling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Largest accepted head, terminator included.
    pub max_head_bytes: usize,
    /// Largest accepted `Content-Length`; unbounded when `None`.
    pub max_body_bytes: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_head_bytes: DEFAULT_MAX_HEAD_BYTES,
            max_body_bytes: None,
        }
    }
}

/// Outcome of feeding one chunk to the reassembler.
#[derive(Debug)]
pub enum Received {
    /// More bytes are needed; nothing to dispatch.
    Pending,
    /// The head and the whole body have arrived. Dispatch and stop reading.
    Ready(PendingRequest),
    /// The head arrived but the body is incomplete. Dispatch the request,
    /// which parks until the body completes, and keep reading.
    Suspended(PendingRequest),
    /// This chunk completed the body and woke the parked request.
    Resumed,
}

/// A parsed request waiting to be handed to the handler.
#[derive(Debug)]
pub struct PendingRequest {
    request: Request,
    parked: Option<Parked>,
}

impl PendingRequest {
    /// The request that will be passed to the handler.
    #[must_use]
    pub fn request(&self) -> &Request { &self.request }

    /// Whether dispatch will wait for the body to complete first.
    #[must_use]
    pub fn is_parked(&self) -> bool { self.parked.is_some() }
}

/// Drives request reassembly for every connection of a server.
pub struct Reassembler {
    store: ConnectionStore<ParseState>,
    sink: Arc<dyn ByteSink>,
    handler: Arc<dyn RequestHandler>,
    limits: Limits,
}

impl std::fmt::Debug for Reassembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reassembler")
            .field("connections", &self.store.len())
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl Reassembler {
    /// Create a reassembler spooling to `sink` and dispatching to `handler`.
    #[must_use]
    pub fn new(sink: Arc<dyn ByteSink>, handler: Arc<dyn RequestHandler>, limits: Limits) -> Self {
        Self {
            store: ConnectionStore::new(),
            sink,
            handler,
            limits,
        }
    }

    /// Configured size limits.
    #[must_use]
    pub fn limits(&self) -> Limits { self.limits }

    /// Parse state of every connection with a request in progress.
    #[must_use]
    pub fn store(&self) -> &ConnectionStore<ParseState> { &self.store }

    /// Phase of `id`, or `None` if it has no request in progress.
    #[must_use]
    pub fn phase(&self, id: ConnectionId) -> Option<Phase> { self.store.read(&id, ParseState::phase) }

    /// Number of connections with a request in progress.
    #[must_use]
    pub fn in_flight(&self) -> usize { self.store.len() }

    /// Feed one received chunk for `id`.
    ///
    /// Chunks for a single connection must be fed in arrival order and never
    /// concurrently. Chunks of different connections are independent.
    ///
    /// # Errors
    ///
    /// Returns a [`RequestError`] if the head is malformed or too large, the
    /// declared body exceeds the limit or the sink fails. The connection's
    /// state and spooled bytes are released before returning.
    pub async fn on_bytes(
        &self,
        id: ConnectionId,
        chunk: &[u8],
    ) -> Result<Received, RequestError> {
        if self.store.create_if_absent(id, ParseState::default) {
            debug!("request cycle started: connection={id}");
        }
        let phase = self.phase(id).unwrap_or(Phase::AwaitingHead);
        let result = match phase {
            Phase::AwaitingHead => self.accept_head_bytes(id, chunk).await,
            Phase::AwaitingBody => self.accept_body_bytes(id, chunk).await,
        };
        if let Err(e) = &result {
            warn!("request failed: connection={id}, error={e}");
            metrics::inc_errors();
            self.discard(id).await;
        }
        result
    }

    async fn accept_head_bytes(
        &self,
        id: ConnectionId,
        chunk: &[u8],
    ) -> Result<Received, RequestError> {
        let limit = self.limits.max_head_bytes;
        let framed = self
            .store
            .update(&id, |state| state.push_head_bytes(chunk, limit))
            .ok_or(RequestError::Aborted)??;
        let Some((head, rest)) = framed else {
            return Ok(Received::Pending);
        };

        let required = head.content_length();
        if let Some(limit) = self.limits.max_body_bytes
            && required > limit
        {
            return Err(RequestError::BodyTooLarge {
                declared: required,
                limit,
            });
        }

        self.sink.append(id, &rest).await?;
        metrics::add_body_bytes(rest.len());
        let received = rest.len() as u64;
        debug!(
            "request head parsed: connection={id}, method={}, uri={}, required={required}, \
             received={received}",
            head.method, head.uri
        );

        let parked = self
            .store
            .update(&id, |state| {
                state.begin_body(required, received);
                if state.body_complete() {
                    None
                } else {
                    let (token, parked) = suspend();
                    state.park(token);
                    Some(parked)
                }
            })
            .ok_or(RequestError::Aborted)?;

        let request = Request::new(
            head,
            BodyRef {
                connection: id,
                len: required,
            },
            Arc::clone(&self.sink),
        );
        Ok(match parked {
            None => Received::Ready(PendingRequest {
                request,
                parked: None,
            }),
            Some(parked) => Received::Suspended(PendingRequest {
                request,
                parked: Some(parked),
            }),
        })
    }

    async fn accept_body_bytes(
        &self,
        id: ConnectionId,
        chunk: &[u8],
    ) -> Result<Received, RequestError> {
        self.sink.append(id, chunk).await?;
        metrics::add_body_bytes(chunk.len());
        let token = self
            .store
            .update(&id, |state| {
                state.record_body(chunk.len() as u64);
                if state.body_complete() {
                    state.take_suspension()
                } else {
                    None
                }
            })
            .ok_or(RequestError::Aborted)?;

        let Some(token) = token else {
            return Ok(Received::Pending);
        };
        if token.resume() {
            debug!("request body complete: connection={id}");
            Ok(Received::Resumed)
        } else {
            Err(RequestError::Aborted)
        }
    }

    /// Run the handler for `pending` once its body is complete.
    ///
    /// Parked requests wait for the receive event that completes the body.
    /// The connection's state and spooled bytes are released once the
    /// handler returns, panics or the wait is abandoned.
    ///
    /// Returns the response to write, or `None` if the connection went away
    /// before the body was complete.
    pub async fn dispatch(&self, pending: PendingRequest) -> Option<Response> {
        let PendingRequest { request, parked } = pending;
        let id = request.connection();

        if let Some(parked) = parked
            && let Err(e) = parked.wait().await
        {
            debug!("parked request abandoned: connection={id}, reason={e}");
            metrics::inc_requests(Outcome::Abandoned);
            self.discard(id).await;
            return e.status().map(Response::status_only);
        }

        let outcome = AssertUnwindSafe(self.handler.handle(request))
            .catch_unwind()
            .await;
        self.discard(id).await;

        match outcome {
            Ok(response) => {
                metrics::inc_requests(Outcome::Handled);
                Some(response)
            }
            Err(panic) => {
                metrics::inc_requests(Outcome::Panicked);
                let panic_msg = format_panic(panic);
                error!("request handler panicked: connection={id}, panic={panic_msg}");
                tracing::error!(panic = %panic_msg, connection = %id, "request handler panicked");
                metrics::inc_errors();
                Some(Response::status_only(StatusCode::INTERNAL_SERVER_ERROR))
            }
        }
    }

    /// Forget `id` after its socket closed or failed.
    ///
    /// A request parked on `id` is woken and abandons dispatch.
    pub async fn on_connection_closed(&self, id: ConnectionId) {
        if self.store.contains(&id) {
            debug!("connection closed mid-request: connection={id}");
        }
        self.discard(id).await;
    }

    /// Expire `id` after it went idle.
    ///
    /// Returns `true` if a parked request was woken; it answers with
    /// `408 Request Time-out` itself. Otherwise the state is dropped and the
    /// caller is responsible for any response.
    pub async fn expire(&self, id: ConnectionId) -> bool {
        let token = self
            .store
            .update(&id, ParseState::take_suspension)
            .flatten();
        if token.is_some_and(SuspensionToken::expire) {
            return true;
        }
        self.discard(id).await;
        false
    }

    async fn discard(&self, id: ConnectionId) {
        drop(self.store.remove(&id));
        if let Err(e) = self.sink.release(id).await {
            warn!("failed to release spooled body: connection={id}, error={e}");
        }
    }
}
