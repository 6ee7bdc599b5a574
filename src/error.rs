//! Canonical error and result types for the crate.
//!
//! Per-request failures are [`RequestError`](crate::reassembler::RequestError)
//! and never escape a connection. [`Error`] covers the failures that stop the
//! process: binding, spool preparation and exporter setup.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::server::ServerError;

/// Top-level error type exposed by `spoolhttp`.
#[derive(Debug, Error)]
pub enum Error {
    /// The server could not bind or run.
    #[error(transparent)]
    Server(#[from] ServerError),
    /// The spool directory could not be created.
    #[error("failed to prepare spool directory {}: {source}", path.display())]
    SpoolDir {
        /// Directory that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The Prometheus exporter could not be installed.
    #[cfg(feature = "metrics")]
    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Canonical result alias used by `spoolhttp` public APIs.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spool_dir_error_names_the_path() {
        let err = Error::SpoolDir {
            path: PathBuf::from("/nope/spool"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        let text = err.to_string();
        assert!(text.contains("/nope/spool"), "{text}");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn server_errors_display_transparently() {
        let err = Error::from(ServerError::Bind(io::Error::from(io::ErrorKind::AddrInUse)));
        assert!(err.to_string().starts_with("bind error"));
    }
}
