//! Spool-directory [`ByteSink`] backend.
//!
//! Each connection owns one file named after its numeric identifier. The
//! file handle stays open between appends and is dropped on release, after
//! which the file itself is removed.

use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::{
    fs::{self, File, OpenOptions},
    io::AsyncWriteExt,
};

use super::{ByteSink, SinkReader, not_found};
use crate::session::ConnectionId;

/// Spools request bodies to files under a directory.
#[derive(Debug)]
pub struct FileSink {
    dir: PathBuf,
    open: DashMap<ConnectionId, File>,
}

impl FileSink {
    /// Create a sink spooling into `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the directory cannot be created.
    pub async fn create(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            open: DashMap::new(),
        })
    }

    /// Directory holding the spool files.
    #[must_use]
    pub fn dir(&self) -> &Path { &self.dir }

    /// Path of the spool file for `id`.
    #[must_use]
    pub fn path_for(&self, id: ConnectionId) -> PathBuf { self.dir.join(id.as_u64().to_string()) }

    async fn take_handle(&self, id: ConnectionId) -> io::Result<File> {
        if let Some((_, file)) = self.open.remove(&id) {
            return Ok(file);
        }
        // First append of a cycle: any stale file from an earlier process is
        // overwritten rather than extended.
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.path_for(id))
            .await
    }
}

#[async_trait]
impl ByteSink for FileSink {
    async fn append(&self, id: ConnectionId, bytes: &[u8]) -> io::Result<()> {
        let mut file = self.take_handle(id).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        self.open.insert(id, file);
        Ok(())
    }

    async fn read(&self, id: ConnectionId) -> io::Result<SinkReader> {
        match File::open(self.path_for(id)).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_found(id)),
            Err(e) => Err(e),
        }
    }

    async fn release(&self, id: ConnectionId) -> io::Result<()> {
        drop(self.open.remove(&id));
        match fs::remove_file(self.path_for(id)).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use rstest::{fixture, rstest};
    use tokio::io::AsyncReadExt;

    use super::*;

    /// Fresh spool directory under the system temp dir.
    #[fixture]
    fn spool_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("spoolhttp-sink-{}-{nanos}", std::process::id()))
    }

    async fn read_all(sink: &FileSink, id: ConnectionId) -> Vec<u8> {
        let mut out = Vec::new();
        sink.read(id)
            .await
            .expect("open spool file")
            .read_to_end(&mut out)
            .await
            .expect("read spool file");
        out
    }

    #[rstest]
    #[tokio::test]
    async fn appends_land_in_per_connection_files(spool_dir: PathBuf) {
        let sink = FileSink::create(&spool_dir).await.expect("create sink");
        let a = ConnectionId::new(11);
        let b = ConnectionId::new(12);
        sink.append(a, b"first ").await.expect("append");
        sink.append(b, b"unrelated").await.expect("append");
        sink.append(a, b"second").await.expect("append");

        assert_eq!(read_all(&sink, a).await, b"first second");
        assert_eq!(read_all(&sink, b).await, b"unrelated");
        assert!(sink.path_for(a).exists());

        sink.release(a).await.expect("release");
        sink.release(b).await.expect("release");
        assert!(!sink.path_for(a).exists());
        fs::remove_dir(&spool_dir).await.expect("spool dir empty");
    }

    #[rstest]
    #[tokio::test]
    async fn stale_file_is_truncated_on_first_append(spool_dir: PathBuf) {
        let sink = FileSink::create(&spool_dir).await.expect("create sink");
        let id = ConnectionId::new(21);
        fs::write(sink.path_for(id), b"leftover from a crash")
            .await
            .expect("seed stale file");

        sink.append(id, b"new").await.expect("append");
        assert_eq!(read_all(&sink, id).await, b"new");

        sink.release(id).await.expect("release");
        fs::remove_dir(&spool_dir).await.expect("spool dir empty");
    }

    #[rstest]
    #[tokio::test]
    async fn empty_append_creates_readable_file(spool_dir: PathBuf) {
        let sink = FileSink::create(&spool_dir).await.expect("create sink");
        let id = ConnectionId::new(31);
        sink.append(id, b"").await.expect("append");
        assert!(read_all(&sink, id).await.is_empty());
        sink.release(id).await.expect("release");
        sink.release(id).await.expect("second release is harmless");
        let err = sink.read(id).await.err().expect("read after release fails");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        fs::remove_dir(&spool_dir).await.expect("spool dir empty");
    }
}
