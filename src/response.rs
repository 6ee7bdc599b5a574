//! Response encoding.
//!
//! [`Response`] collects a status, content type, body and optional extra
//! header lines and serialises them into HTTP/1.1 wire bytes. Only status
//! codes from a fixed table are representable; asking for any other code
//! fails with [`UnknownStatusCode`] instead of falling back to a default.

use std::{fmt, time::SystemTime};

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Value of the `Server` header sent with every response.
pub const SERVER_NAME: &str = "spoolhttp";

/// Content type used when none is given.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=UTF-8";

const STATUS_TABLE: &[(u16, &str)] = &[
    (100, "Continue"),
    (101, "Switching Protocols"),
    (200, "OK"),
    (201, "Created"),
    (202, "Accepted"),
    (203, "Non-Authoritative Information"),
    (204, "No Content"),
    (205, "Reset Content"),
    (206, "Partial Content"),
    (207, "Multi-Status"),
    (300, "Multiple Choices"),
    (301, "Moved Permanently"),
    (302, "Found"),
    (303, "See Other"),
    (304, "Not Modified"),
    (305, "Use Proxy"),
    (307, "Temporary Redirect"),
    (400, "Bad Request"),
    (401, "Unauthorized"),
    (402, "Payment Required"),
    (403, "Forbidden"),
    (404, "Not Found"),
    (405, "Method Not Allowed"),
    (406, "Not Acceptable"),
    (407, "Proxy Authentication Required"),
    (408, "Request Time-out"),
    (409, "Conflict"),
    (410, "Gone"),
    (411, "Length Required"),
    (412, "Precondition Failed"),
    (413, "Request Entity Too Large"),
    (414, "Request-URI Too Large"),
    (415, "Unsupported Media Type"),
    (416, "Requested range not satisfiable"),
    (417, "Expectation Failed"),
    (500, "Internal Server Error"),
    (501, "Not Implemented"),
    (502, "Bad Gateway"),
    (503, "Service Unavailable"),
    (504, "Gateway Time-out"),
];

/// A status code outside the supported table was requested.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("unknown status code: {0}")]
pub struct UnknownStatusCode(pub u16);

/// A status code present in the supported table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    /// `200 OK`.
    pub const OK: Self = Self(200);
    /// `400 Bad Request`.
    pub const BAD_REQUEST: Self = Self(400);
    /// `408 Request Time-out`.
    pub const REQUEST_TIMEOUT: Self = Self(408);
    /// `413 Request Entity Too Large`.
    pub const PAYLOAD_TOO_LARGE: Self = Self(413);
    /// `500 Internal Server Error`.
    pub const INTERNAL_SERVER_ERROR: Self = Self(500);

    /// Look up `code` in the status table.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownStatusCode`] if `code` is not in the table.
    pub fn from_u16(code: u16) -> Result<Self, UnknownStatusCode> {
        if STATUS_TABLE.iter().any(|(c, _)| *c == code) {
            Ok(Self(code))
        } else {
            Err(UnknownStatusCode(code))
        }
    }

    /// Numeric value of the code.
    #[must_use]
    pub const fn as_u16(self) -> u16 { self.0 }

    /// Standard reason phrase.
    #[must_use]
    pub fn reason(self) -> &'static str {
        STATUS_TABLE
            .iter()
            .find(|(c, _)| *c == self.0)
            .map_or("", |(_, reason)| reason)
    }
}

impl TryFrom<u16> for StatusCode {
    type Error = UnknownStatusCode;

    fn try_from(code: u16) -> Result<Self, Self::Error> { Self::from_u16(code) }
}

impl fmt::Display for StatusCode {
    /// Formats the full status line, e.g. `HTTP/1.1 200 OK`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/1.1 {} {}", self.0, self.reason())
    }
}

/// An outgoing response.
///
/// Built fresh for every reply; nothing is shared between responses.
///
/// # Examples
///
/// ```
/// use spoolhttp::response::{Response, StatusCode};
///
/// let wire = Response::new(StatusCode::OK)
///     .content_type("text/html; charset=utf-8")
///     .body("hi")
///     .encode();
/// let text = String::from_utf8_lossy(&wire);
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("\r\nContent-Length: 2\r\n"));
/// assert!(text.ends_with("\r\n\r\nhi"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    content_type: String,
    connection: String,
    content_length: u64,
    headers: Vec<String>,
    body: Bytes,
}

impl Response {
    /// Create an empty response with the default content type and
    /// `Connection: close`.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            content_type: DEFAULT_CONTENT_TYPE.to_owned(),
            connection: "close".to_owned(),
            content_length: 0,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Plain-text response whose body is the status reason phrase.
    #[must_use]
    pub fn status_only(status: StatusCode) -> Self { Self::new(status).body(status.reason()) }

    /// Set the `Content-Type` value.
    #[must_use]
    pub fn content_type(mut self, value: impl Into<String>) -> Self {
        self.content_type = value.into();
        self
    }

    /// Set the `Connection` directive.
    #[must_use]
    pub fn connection(mut self, value: impl Into<String>) -> Self {
        self.connection = value.into();
        self
    }

    /// Override the advertised `Content-Length`; zero means "use the body
    /// length".
    #[must_use]
    pub fn content_length(mut self, length: u64) -> Self {
        self.content_length = length;
        self
    }

    /// Append a complete header line such as `X-Upload-Id: 7`.
    #[must_use]
    pub fn header(mut self, line: impl Into<String>) -> Self {
        self.headers.push(line.into());
        self
    }

    /// Set the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Status of the response.
    #[must_use]
    pub fn status(&self) -> StatusCode { self.status }

    /// Body bytes.
    #[must_use]
    pub fn body_bytes(&self) -> &Bytes { &self.body }

    /// Length sent in the `Content-Length` header.
    #[must_use]
    pub fn advertised_length(&self) -> u64 {
        if self.content_length > 0 {
            self.content_length
        } else {
            self.body.len() as u64
        }
    }

    /// Serialise with the current time in the `Date` header.
    #[must_use]
    pub fn encode(&self) -> Bytes { self.encode_at(SystemTime::now()) }

    /// Serialise with `now` in the `Date` header.
    #[must_use]
    pub fn encode_at(&self, now: SystemTime) -> Bytes {
        let head = format!(
            "{}\r\nDate: {}\r\nContent-Type: {}\r\nConnection: {}\r\nContent-Length: {}\r\nServer: \
             {SERVER_NAME}\r\n",
            self.status,
            httpdate::fmt_http_date(now),
            self.content_type,
            self.connection,
            self.advertised_length(),
        );
        let extra: usize = self.headers.iter().map(|h| h.len() + 2).sum();
        let mut out = BytesMut::with_capacity(head.len() + extra + 2 + self.body.len());
        out.put_slice(head.as_bytes());
        for line in &self.headers {
            out.put_slice(line.as_bytes());
            out.put_slice(b"\r\n");
        }
        out.put_slice(b"\r\n");
        out.put_slice(&self.body);
        out.freeze()
    }
}

/// Encode a response for `code` in one call.
///
/// # Errors
///
/// Returns [`UnknownStatusCode`] if `code` is not in the status table.
pub fn build_response(
    code: u16,
    content_type: &str,
    body: impl Into<Bytes>,
) -> Result<Bytes, UnknownStatusCode> {
    let status = StatusCode::from_u16(code)?;
    Ok(Response::new(status)
        .content_type(content_type)
        .body(body)
        .encode())
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use rstest::rstest;

    use super::*;

    fn text(bytes: &[u8]) -> &str { std::str::from_utf8(bytes).expect("utf-8 response") }

    #[test]
    fn build_response_has_expected_shape() {
        let wire = build_response(200, "text/html; charset=utf-8", "hi").expect("known status");
        let text = text(&wire);
        let (head, body) = text.split_once("\r\n\r\n").expect("blank line");
        let mut lines = head.split("\r\n");
        assert_eq!(lines.next(), Some("HTTP/1.1 200 OK"));
        assert!(head.contains("Content-Type: text/html; charset=utf-8"));
        assert!(head.contains("Connection: close"));
        assert!(head.contains("Content-Length: 2"));
        assert!(head.contains("Server: spoolhttp"));
        assert_eq!(body, "hi");
    }

    #[test]
    fn encode_at_writes_headers_in_order() {
        let now = UNIX_EPOCH + Duration::from_secs(784_111_777);
        let wire = Response::new(StatusCode::OK)
            .connection("keep-alive")
            .header("X-One: 1")
            .header("X-Two: 2")
            .body("body")
            .encode_at(now);
        assert_eq!(
            text(&wire),
            "HTTP/1.1 200 OK\r\nDate: Sun, 06 Nov 1994 08:49:37 GMT\r\nContent-Type: text/plain; \
             charset=UTF-8\r\nConnection: keep-alive\r\nContent-Length: 4\r\nServer: \
             spoolhttp\r\nX-One: 1\r\nX-Two: 2\r\n\r\nbody"
        );
    }

    #[test]
    fn explicit_content_length_overrides_body_length() {
        let response = Response::new(StatusCode::OK).content_length(99).body("abc");
        assert_eq!(response.advertised_length(), 99);
        assert!(text(&response.encode()).contains("Content-Length: 99\r\n"));
        assert_eq!(Response::new(StatusCode::OK).body("abc").advertised_length(), 3);
    }

    #[rstest]
    #[case(100, "HTTP/1.1 100 Continue")]
    #[case(207, "HTTP/1.1 207 Multi-Status")]
    #[case(307, "HTTP/1.1 307 Temporary Redirect")]
    #[case(408, "HTTP/1.1 408 Request Time-out")]
    #[case(416, "HTTP/1.1 416 Requested range not satisfiable")]
    #[case(504, "HTTP/1.1 504 Gateway Time-out")]
    fn status_lines_match_table(#[case] code: u16, #[case] line: &str) {
        assert_eq!(StatusCode::from_u16(code).expect("known").to_string(), line);
    }

    #[rstest]
    #[case(0)]
    #[case(208)]
    #[case(306)]
    #[case(418)]
    #[case(505)]
    fn unknown_codes_are_rejected(#[case] code: u16) {
        assert_eq!(StatusCode::from_u16(code), Err(UnknownStatusCode(code)));
        assert_eq!(
            build_response(code, "text/plain", ""),
            Err(UnknownStatusCode(code))
        );
    }

    #[test]
    fn table_covers_every_supported_code() {
        let codes: Vec<u16> = STATUS_TABLE.iter().map(|(c, _)| *c).collect();
        let mut expected = vec![100, 101];
        expected.extend(200..=207);
        expected.extend([300, 301, 302, 303, 304, 305, 307]);
        expected.extend(400..=417);
        expected.extend(500..=504);
        assert_eq!(codes, expected);
    }

    #[test]
    fn binary_body_is_copied_verbatim() {
        let body = Bytes::from_static(&[0, 159, 146, 150, b'\r', b'\n']);
        let wire = Response::new(StatusCode::OK).body(body.clone()).encode();
        assert!(wire.ends_with(&body));
    }
}
