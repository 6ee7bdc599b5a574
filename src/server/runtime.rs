//! Runtime control for [`HttpServer`].

mod accept;
mod backoff;

use std::sync::Arc;

#[cfg(test)]
pub(super) use accept::MockAcceptListener;
pub(super) use accept::{AcceptLoopOptions, accept_loop};
pub use backoff::BackoffConfig;
use futures::Future;
use log::{info, warn};
use tokio::{select, signal};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::{Bound, HttpServer, ServerError, connection::ConnectionOptions};
use crate::reassembler::Reassembler;

impl HttpServer<Bound> {
    /// Run the server until a shutdown signal is received.
    ///
    /// Spawns the configured number of worker tasks and awaits Ctrl+C for shutdown.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use spoolhttp::{handler::EchoHandler, server::HttpServer};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), spoolhttp::server::ServerError> {
    /// let server = HttpServer::new(EchoHandler).bind(([127, 0, 0, 1], 5555).into())?;
    /// server.run().await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// Attempting to run a server without binding fails to compile:
    ///
    /// ```compile_fail
    /// use spoolhttp::{handler::EchoHandler, server::HttpServer};
    ///
    /// async fn try_run() {
    ///     HttpServer::new(EchoHandler)
    ///         .run()
    ///         .await
    ///         .expect("unbound servers do not expose run()");
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// Accept failures are retried with exponential back-off and do not
    /// surface as errors; the `Result` is kept for future fatal conditions.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await
    }

    /// Run the server until the `shutdown` future resolves.
    ///
    /// In-flight connections are allowed to finish before this returns.
    ///
    /// # Examples
    ///
    /// ```
    /// use spoolhttp::{handler::EchoHandler, server::HttpServer};
    /// use tokio::sync::oneshot;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), spoolhttp::server::ServerError> {
    /// let server = HttpServer::new(EchoHandler).bind(([127, 0, 0, 1], 0).into())?;
    ///
    /// let (tx, rx) = oneshot::channel::<()>();
    /// let handle = tokio::spawn(async move {
    ///     server
    ///         .run_with_shutdown(async {
    ///             let _ = rx.await;
    ///         })
    ///         .await
    /// });
    ///
    /// let _ = tx.send(());
    /// handle
    ///     .await
    ///     .expect("join server task")
    ///     .expect("server run failed");
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Accept failures are retried with exponential back-off and do not
    /// surface as errors.
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "tokio::select! expands to modulus internally"
    )]
    pub async fn run_with_shutdown<S>(self, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()> + Send,
    {
        let HttpServer {
            handler,
            sink,
            config,
            workers,
            ready_tx,
            state: Bound { listener },
        } = self;
        let shutdown_token = CancellationToken::new();
        let tracker = TaskTracker::new();
        let engine = Arc::new(Reassembler::new(sink, handler, config.limits));
        let connection = ConnectionOptions::from(&config);

        if let Ok(addr) = listener.local_addr() {
            info!("listening: addr={addr}, workers={workers}");
        }

        for _ in 0..workers {
            tracker.spawn(accept_loop(
                Arc::clone(&listener),
                Arc::clone(&engine),
                AcceptLoopOptions {
                    connection,
                    shutdown: shutdown_token.clone(),
                    tracker: tracker.clone(),
                    backoff: config.backoff,
                },
            ));
        }

        // Signal readiness after all workers have been spawned.
        if let Some(tx) = ready_tx
            && tx.send(()).is_err()
        {
            warn!("Failed to send readiness signal: receiver dropped");
        }

        select! {
            () = shutdown => shutdown_token.cancel(),
            () = tracker.wait() => {},
        }

        tracker.close();
        tracker.wait().await;
        info!("server stopped");
        Ok(())
    }
}
