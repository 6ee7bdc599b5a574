//! Request handler contract.
//!
//! A [`RequestHandler`] runs once per connection, after the request body
//! has been fully spooled. It receives the [`Request`] and returns the
//! [`Response`] written back to the client. The body stays readable until
//! the handler returns.

use std::future::Future;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    payload::{FormValue, Payload},
    request::Request,
    response::{Response, StatusCode},
};

/// Business logic invoked for each fully received request.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Produce the response for `request`.
    async fn handle(&self, request: Request) -> Response;
}

/// Adapter turning an async closure into a [`RequestHandler`].
///
/// # Examples
///
/// ```
/// use spoolhttp::{
///     handler::handler_fn,
///     response::{Response, StatusCode},
/// };
///
/// let _handler = handler_fn(|request| async move {
///     Response::new(StatusCode::OK).body(format!("{} {}", request.method(), request.uri()))
/// });
/// ```
#[derive(Clone, Debug)]
pub struct HandlerFn<F>(F);

/// Wrap `f` as a [`RequestHandler`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    HandlerFn(f)
}

#[async_trait]
impl<F, Fut> RequestHandler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    async fn handle(&self, request: Request) -> Response { (self.0)(request).await }
}

/// Replies with the request URI and method.
///
/// `POST` bodies are decoded and a summary of the decoded fields is logged.
#[derive(Clone, Copy, Debug, Default)]
pub struct EchoHandler;

#[async_trait]
impl RequestHandler for EchoHandler {
    async fn handle(&self, request: Request) -> Response {
        if request.method() == "POST" {
            match request.payload().await {
                Ok(payload) => log_payload(&request, &payload),
                Err(e) => warn!(connection = %request.connection(), error = %e, "failed to read body"),
            }
        }
        let text = format!(
            "You requested: {}  method: {}",
            request.uri(),
            request.method()
        );
        Response::new(StatusCode::OK)
            .content_type("text/html; charset=utf-8")
            .body(text)
    }
}

fn log_payload(request: &Request, payload: &Payload) {
    match payload {
        Payload::Form(form) => {
            for (name, value) in form {
                match value {
                    FormValue::Text(text) => {
                        debug!(connection = %request.connection(), field = %name, len = text.len(), "form field");
                    }
                    FormValue::File(file) => debug!(
                        connection = %request.connection(),
                        field = %name,
                        filename = %file.filename,
                        content_type = %file.content_type,
                        len = file.data.len(),
                        "uploaded file"
                    ),
                }
            }
        }
        Payload::Raw(bytes) => {
            debug!(connection = %request.connection(), len = bytes.len(), "raw body");
        }
    }
}
