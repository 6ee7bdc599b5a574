//! Per-connection parse state.

use bytes::{Bytes, BytesMut};

use super::{RequestError, suspend::SuspensionToken};
use crate::framer::{self, FramedHead, RequestHead};

/// Where a connection stands in its request cycle.
///
/// A connection without a state entry has not sent anything yet (or has
/// completed its request); the entry is deleted once the handler returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Bytes are accumulating until the head terminator arrives.
    AwaitingHead,
    /// The head is parsed; body bytes are being spooled.
    AwaitingBody,
}

/// In-progress parse state of one connection.
#[derive(Debug, Default)]
pub struct ParseState {
    head_buf: BytesMut,
    head_parsed: bool,
    required_length: u64,
    received_length: u64,
    suspension: Option<SuspensionToken>,
}

impl ParseState {
    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        if self.head_parsed {
            Phase::AwaitingBody
        } else {
            Phase::AwaitingHead
        }
    }

    /// Declared body length; zero until the head is parsed.
    #[must_use]
    pub fn required_length(&self) -> u64 { self.required_length }

    /// Body bytes persisted to the sink so far.
    #[must_use]
    pub fn received_length(&self) -> u64 { self.received_length }

    /// Bytes buffered while waiting for the head terminator.
    #[must_use]
    pub fn buffered_head_len(&self) -> usize { self.head_buf.len() }

    /// Whether a request task is parked on this connection.
    #[must_use]
    pub fn is_suspended(&self) -> bool { self.suspension.is_some() }

    /// Whether every declared body byte has been persisted.
    #[must_use]
    pub fn body_complete(&self) -> bool {
        self.head_parsed && self.received_length >= self.required_length
    }

    /// Buffer `chunk` and try to frame the head.
    ///
    /// On success the head buffer is emptied and the bytes following the
    /// terminator are returned alongside the parsed head.
    pub(super) fn push_head_bytes(
        &mut self,
        chunk: &[u8],
        limit: usize,
    ) -> Result<Option<(RequestHead, Bytes)>, RequestError> {
        self.head_buf.extend_from_slice(chunk);
        match framer::frame_head(&self.head_buf)? {
            Some(FramedHead { body_offset, .. }) if body_offset > limit => {
                Err(RequestError::HeadTooLarge { limit })
            }
            Some(FramedHead { head, body_offset }) => {
                let rest = self.head_buf.split_off(body_offset).freeze();
                self.head_buf = BytesMut::new();
                Ok(Some((head, rest)))
            }
            None if self.head_buf.len() > limit => Err(RequestError::HeadTooLarge { limit }),
            None => Ok(None),
        }
    }

    /// Record the parsed head and the body bytes that came with it.
    pub(super) fn begin_body(&mut self, required: u64, received: u64) {
        self.head_parsed = true;
        self.required_length = required;
        self.received_length = received;
    }

    /// Count `len` more persisted body bytes.
    pub(super) fn record_body(&mut self, len: u64) {
        self.received_length = self.received_length.saturating_add(len);
    }

    pub(super) fn park(&mut self, token: SuspensionToken) { self.suspension = Some(token); }

    pub(super) fn take_suspension(&mut self) -> Option<SuspensionToken> { self.suspension.take() }
}
