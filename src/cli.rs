//! Command line interface for the `spoolhttp` binary.
//!
//! Shared with `build.rs`, which renders the man page from it.

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Command line arguments for the `spoolhttp` binary.
#[derive(Debug, Parser)]
#[command(
    name = "spoolhttp",
    version,
    about = "Minimal HTTP/1.1 server that spools request bodies before dispatch"
)]
pub struct Cli {
    /// Address to listen on.
    #[arg(short, long, default_value = "0.0.0.0:5555")]
    pub bind: SocketAddr,

    /// Number of accept loops; defaults to the available parallelism.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Directory receiving one spool file per connection.
    #[arg(long, default_value = "./tmp")]
    pub spool_dir: PathBuf,

    /// Keep request bodies in memory instead of spooling them to disk.
    #[arg(long, conflicts_with = "spool_dir")]
    pub memory_spool: bool,

    /// Seconds a connection may stay silent before it is answered with 408.
    /// Zero disables the timeout.
    #[arg(long, default_value_t = 30)]
    pub idle_timeout_secs: u64,

    /// Largest accepted request head in bytes.
    #[arg(long, default_value_t = 64 * 1024)]
    pub max_header_bytes: usize,

    /// Largest accepted Content-Length in bytes; unlimited when omitted.
    #[arg(long)]
    pub max_body_bytes: Option<u64>,

    /// Address for the Prometheus metrics exporter; disabled when omitted.
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn defaults_listen_on_5555_and_spool_to_tmp() {
        let cli = Cli::parse_from(["spoolhttp"]);
        assert_eq!(cli.bind.port(), 5555);
        assert_eq!(cli.spool_dir, std::path::PathBuf::from("./tmp"));
        assert!(!cli.memory_spool);
        assert_eq!(cli.idle_timeout_secs, 30);
        assert_eq!(cli.max_header_bytes, 65536);
        assert_eq!(cli.max_body_bytes, None);
        assert_eq!(cli.workers, None);
    }

    #[test]
    fn parses_limits_and_addresses() {
        let cli = Cli::parse_from([
            "spoolhttp",
            "--bind",
            "127.0.0.1:8080",
            "--workers",
            "2",
            "--idle-timeout-secs",
            "0",
            "--max-body-bytes",
            "1048576",
            "--metrics-addr",
            "127.0.0.1:9000",
        ]);
        assert_eq!(cli.bind, "127.0.0.1:8080".parse().expect("addr"));
        assert_eq!(cli.workers, Some(2));
        assert_eq!(cli.idle_timeout_secs, 0);
        assert_eq!(cli.max_body_bytes, Some(1_048_576));
        assert!(cli.metrics_addr.is_some());
    }

    #[test]
    fn memory_spool_conflicts_with_explicit_dir() {
        let res = Cli::try_parse_from(["spoolhttp", "--memory-spool", "--spool-dir", "/var/x"]);
        assert!(res.is_err());
    }
}
