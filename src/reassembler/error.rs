//! Errors raised while reassembling a request.

use std::io;

use thiserror::Error;

use crate::{framer::FramerError, response::StatusCode};

/// Failures that end the current request cycle of a connection.
///
/// Each variant aborts only its own connection; the state entry and the
/// spooled bytes are released before the error is returned.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request head could not be parsed.
    #[error("malformed request: {0}")]
    Malformed(#[from] FramerError),
    /// The head grew past the configured limit without terminating.
    #[error("request head exceeds {limit} bytes")]
    HeadTooLarge {
        /// Configured head size limit.
        limit: usize,
    },
    /// The declared body length exceeds the configured limit.
    #[error("declared body of {declared} bytes exceeds limit of {limit} bytes")]
    BodyTooLarge {
        /// Value of `Content-Length`.
        declared: u64,
        /// Configured body size limit.
        limit: u64,
    },
    /// The byte sink failed.
    #[error("body spool failed: {0}")]
    Sink(#[from] io::Error),
    /// The connection closed before the body was complete.
    #[error("connection closed before the body was complete")]
    Aborted,
    /// The connection went idle before the body was complete.
    #[error("connection idle before the body was complete")]
    TimedOut,
}

impl RequestError {
    /// Status of the response reporting this error, if one should be sent.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Malformed(_) => Some(StatusCode::BAD_REQUEST),
            Self::HeadTooLarge { .. } | Self::BodyTooLarge { .. } => {
                Some(StatusCode::PAYLOAD_TOO_LARGE)
            }
            Self::Sink(_) => Some(StatusCode::INTERNAL_SERVER_ERROR),
            Self::TimedOut => Some(StatusCode::REQUEST_TIMEOUT),
            Self::Aborted => None,
        }
    }
}
