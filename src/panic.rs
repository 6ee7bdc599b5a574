//! Panic payload formatting.
//!
//! Request handlers and connection tasks run under `catch_unwind`. A caught
//! payload is an opaque `Box<dyn Any + Send>`; [`format_panic`] wraps it so
//! it can be logged with the panic message when there is one.

use std::{any::Any, fmt};

/// A caught panic payload that displays as its message.
///
/// ```
/// use spoolhttp::panic::format_panic;
/// assert_eq!(format_panic(Box::new("boom")).to_string(), "boom");
/// assert_eq!(
///     format_panic(Box::new(String::from("boom"))).message(),
///     Some("boom")
/// );
/// assert!(format_panic(Box::new(5_u32)).to_string().contains("Any"));
/// ```
#[derive(Debug)]
#[must_use]
pub struct PanicMessage(Box<dyn Any + Send>);

impl PanicMessage {
    /// Message passed to `panic!`, if the payload is a string.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.0
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| self.0.downcast_ref::<&'static str>().copied())
    }

    /// Recover the original payload, e.g. to resume unwinding.
    pub fn into_inner(self) -> Box<dyn Any + Send> { self.0 }
}

impl fmt::Display for PanicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(msg) => f.write_str(msg),
            None => write!(f, "{:?}", self.0),
        }
    }
}

/// Wrap a caught panic payload for logging.
pub fn format_panic(panic: Box<dyn Any + Send>) -> PanicMessage { PanicMessage(panic) }

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::*;

    #[tokio::test]
    async fn caught_future_panic_keeps_its_message() {
        let caught = std::panic::AssertUnwindSafe(async { panic!("handler exploded") })
            .catch_unwind()
            .await
            .expect_err("future panics");
        assert_eq!(format_panic(caught).message(), Some("handler exploded"));
    }

    #[test]
    fn formatted_payload_keeps_its_arguments() {
        let caught = std::panic::catch_unwind(|| panic!("bad id {}", 7)).expect_err("panics");
        assert_eq!(format_panic(caught).to_string(), "bad id 7");
    }
}
