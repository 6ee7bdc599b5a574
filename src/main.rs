//! `spoolhttp` server binary.
//!
//! Parses CLI arguments, installs logging and serves the echo handler until
//! Ctrl+C.

mod cli;

use std::{sync::Arc, time::Duration};

use clap::Parser;
use spoolhttp::{
    Error,
    config::ServerConfig,
    handler::EchoHandler,
    server::HttpServer,
    sink::{ByteSink, FileSink, MemorySink},
};
use tracing::info;

#[tokio::main]
async fn main() -> spoolhttp::Result<()> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let cli = cli::Cli::parse();

    #[cfg(feature = "metrics")]
    if let Some(addr) = cli.metrics_addr {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!(%addr, "metrics exporter listening");
    }

    let sink: Arc<dyn ByteSink> = if cli.memory_spool {
        Arc::new(MemorySink::new())
    } else {
        let sink = FileSink::create(&cli.spool_dir)
            .await
            .map_err(|source| Error::SpoolDir {
                path: cli.spool_dir.clone(),
                source,
            })?;
        info!(dir = %sink.dir().display(), "spooling request bodies to disk");
        Arc::new(sink)
    };

    let config = ServerConfig::default()
        .idle_timeout(Some(Duration::from_secs(cli.idle_timeout_secs)))
        .max_head_bytes(cli.max_header_bytes)
        .max_body_bytes(cli.max_body_bytes);

    let mut server = HttpServer::new(EchoHandler).sink(sink).config(config);
    if let Some(workers) = cli.workers {
        server = server.workers(workers);
    }
    server.bind(cli.bind)?.run().await?;
    Ok(())
}
