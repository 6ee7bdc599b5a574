//! In-memory [`ByteSink`] backend.

use std::io::{self, Cursor};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;

use super::{ByteSink, SinkReader, not_found};
use crate::session::ConnectionId;

/// Keeps each connection's body in a growable buffer.
#[derive(Debug, Default)]
pub struct MemorySink(DashMap<ConnectionId, BytesMut>);

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Snapshot of the bytes currently held for `id`.
    #[must_use]
    pub fn contents(&self, id: ConnectionId) -> Option<Bytes> {
        self.0.get(&id).map(|buf| Bytes::copy_from_slice(&buf))
    }

    /// Whether any bytes are held for `id`.
    #[must_use]
    pub fn holds(&self, id: ConnectionId) -> bool { self.0.contains_key(&id) }

    /// Number of connections with live storage.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Whether no connection has live storage.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

#[async_trait]
impl ByteSink for MemorySink {
    async fn append(&self, id: ConnectionId, bytes: &[u8]) -> io::Result<()> {
        self.0.entry(id).or_default().extend_from_slice(bytes);
        Ok(())
    }

    async fn read(&self, id: ConnectionId) -> io::Result<SinkReader> {
        let bytes = self.contents(id).ok_or_else(|| not_found(id))?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    async fn release(&self, id: ConnectionId) -> io::Result<()> {
        self.0.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn appends_accumulate_per_connection() {
        let sink = MemorySink::new();
        let a = ConnectionId::new(1);
        let b = ConnectionId::new(2);
        sink.append(a, b"hel").await.expect("append");
        sink.append(b, b"other").await.expect("append");
        sink.append(a, b"lo").await.expect("append");

        let mut out = Vec::new();
        sink.read(a)
            .await
            .expect("read")
            .read_to_end(&mut out)
            .await
            .expect("read_to_end");
        assert_eq!(out, b"hello");
        assert_eq!(sink.contents(b).as_deref(), Some(&b"other"[..]));
    }

    #[tokio::test]
    async fn release_discards_bytes() {
        let sink = MemorySink::new();
        let id = ConnectionId::new(5);
        sink.append(id, b"x").await.expect("append");
        sink.release(id).await.expect("release");
        assert!(!sink.holds(id));
        let err = sink.read(id).await.err().expect("read after release fails");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        sink.release(id).await.expect("double release is harmless");
    }
}
