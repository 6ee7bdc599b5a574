//! Append-only storage for request body bytes.
//!
//! A [`ByteSink`] holds the body of the request currently being received on
//! each connection, keyed by [`ConnectionId`]. The reassembler appends every
//! body-bearing chunk before it compares lengths, hands handlers a reader
//! over the spooled bytes, and releases the storage once the request cycle
//! ends. Two backends ship with the crate:
//!
//! - [`MemorySink`] keeps bytes in memory and suits tests and small bodies.
//! - [`FileSink`] spools each connection to its own file in a directory.

mod file;
mod memory;

use std::io;

use async_trait::async_trait;
pub use file::FileSink;
pub use memory::MemorySink;
use tokio::io::AsyncRead;

use crate::session::ConnectionId;

/// Reader over the bytes spooled for one connection.
pub type SinkReader = Box<dyn AsyncRead + Send + Unpin>;

/// Storage backend receiving request bodies.
///
/// Calls for one connection are serialised by the caller; calls for
/// different connections may run concurrently.
#[async_trait]
pub trait ByteSink: Send + Sync + 'static {
    /// Append `bytes` to the storage for `id`, creating it if needed.
    ///
    /// The bytes must be persisted by the time the future resolves.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the backend fails to store the bytes.
    async fn append(&self, id: ConnectionId, bytes: &[u8]) -> io::Result<()>;

    /// Open a reader positioned at the start of the bytes stored for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotFound`] if nothing was stored for `id`, or
    /// another [`io::Error`] if the backend cannot be read.
    async fn read(&self, id: ConnectionId) -> io::Result<SinkReader>;

    /// Discard everything stored for `id`.
    ///
    /// Releasing an unknown identifier is not an error.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the backend fails to remove the bytes.
    async fn release(&self, id: ConnectionId) -> io::Result<()>;
}

pub(crate) fn not_found(id: ConnectionId) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no spooled body for {id}"))
}
