#![doc(html_root_url = "https://docs.rs/spoolhttp/latest")]
//! Public API for the `spoolhttp` library.
//!
//! A minimal HTTP/1.1 server over raw TCP. Request heads may arrive split
//! across any number of reads; bodies are spooled to a [`ByteSink`] as they
//! arrive and the [`RequestHandler`] only runs once the declared
//! `Content-Length` has been persisted. Many connections can upload
//! concurrently without their bytes or parse state mixing.
//!
//! ```no_run
//! use spoolhttp::{handler::EchoHandler, server::HttpServer};
//!
//! # #[tokio::main]
//! # async fn main() -> spoolhttp::Result<()> {
//! HttpServer::new(EchoHandler)
//!     .bind(([127, 0, 0, 1], 5555).into())?
//!     .run()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod framer;
pub mod handler;
pub mod metrics;
pub mod panic;
pub mod payload;
pub mod reassembler;
pub mod request;
pub mod response;
pub mod server;
pub mod session;
pub mod sink;

pub use config::ServerConfig;
pub use error::{Error, Result};
pub use handler::{EchoHandler, RequestHandler, handler_fn};
pub use reassembler::{Reassembler, RequestError};
pub use request::Request;
pub use response::{Response, StatusCode};
pub use server::HttpServer;
pub use session::{ConnectionId, ConnectionStore};
pub use sink::{ByteSink, FileSink, MemorySink};
