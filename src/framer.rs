//! Request head framing.
//!
//! The framer locates the blank line terminating an HTTP/1.1 head inside a
//! growing byte buffer and parses the request line and header fields in
//! front of it. A buffer without a terminator is not an error: the caller
//! keeps accumulating bytes and tries again.

use memchr::memmem;
use thiserror::Error;

/// Byte sequence separating the request head from the body.
pub const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Line ending used inside the request head.
pub const CRLF: &[u8] = b"\r\n";

/// Errors raised while parsing a located request head.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FramerError {
    /// The request line did not carry method, URI and protocol version.
    #[error("malformed request line: {line:?}")]
    MalformedRequestLine {
        /// The offending line.
        line: String,
    },
    /// The head contained bytes that are not valid UTF-8.
    #[error("request head is not valid UTF-8")]
    HeadNotUtf8,
}

/// Header fields in arrival order.
///
/// Names keep the spelling they arrived with but are matched
/// ASCII-case-insensitively. Inserting a name that is already present
/// replaces the earlier field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    /// Create an empty header map.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Insert a field, replacing any field with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.0.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            *slot = (name, value);
        } else {
            self.0.push((name, value));
        }
    }

    /// Value of the field called `name`, compared case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether a field called `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool { self.get(name).is_some() }

    /// Iterate over `(name, value)` pairs in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Whether no fields are present.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

/// Parsed request line and header fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestHead {
    /// Upper-cased request method.
    pub method: String,
    /// Request target exactly as sent.
    pub uri: String,
    /// Protocol version token, e.g. `HTTP/1.1`.
    pub version: String,
    /// Header fields.
    pub headers: Headers,
}

impl RequestHead {
    /// Declared body length.
    ///
    /// A missing or non-numeric `Content-Length` counts as zero.
    #[must_use]
    pub fn content_length(&self) -> u64 {
        self.headers
            .get("Content-Length")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Value of the `Content-Type` header, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> { self.headers.get("Content-Type") }
}

/// A request head located in a buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramedHead {
    /// The parsed head.
    pub head: RequestHead,
    /// Offset of the first body byte in the framed buffer.
    pub body_offset: usize,
}

/// Offset of the first head terminator in `buf`.
#[must_use]
pub fn find_head_end(buf: &[u8]) -> Option<usize> { memmem::find(buf, HEAD_TERMINATOR) }

/// Locate and parse the request head at the start of `buf`.
///
/// Returns `Ok(None)` while the terminator has not arrived.
///
/// # Errors
///
/// Returns [`FramerError`] if the located head cannot be parsed.
pub fn frame_head(buf: &[u8]) -> Result<Option<FramedHead>, FramerError> {
    let Some(end) = find_head_end(buf) else {
        return Ok(None);
    };
    let text = std::str::from_utf8(&buf[..end]).map_err(|_| FramerError::HeadNotUtf8)?;
    let (line, fields) = text.split_once("\r\n").unwrap_or((text, ""));
    let (method, uri, version) = parse_request_line(line)?;
    Ok(Some(FramedHead {
        head: RequestHead {
            method,
            uri,
            version,
            headers: parse_header_fields(fields),
        },
        body_offset: end + HEAD_TERMINATOR.len(),
    }))
}

/// Split a request line into method, URI and protocol version.
///
/// Tokens are separated by single spaces; tokens past the third are ignored.
///
/// # Errors
///
/// Returns [`FramerError::MalformedRequestLine`] if fewer than three tokens
/// are present.
pub fn parse_request_line(line: &str) -> Result<(String, String, String), FramerError> {
    let mut tokens = line.split(' ');
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(method), Some(uri), Some(version)) => Ok((
            method.trim().to_ascii_uppercase(),
            uri.trim().to_owned(),
            version.trim().to_owned(),
        )),
        _ => Err(FramerError::MalformedRequestLine {
            line: line.to_owned(),
        }),
    }
}

/// Parse CRLF-separated `name: value` lines.
///
/// Lines without a colon are skipped; repeated names keep the last value.
#[must_use]
pub fn parse_header_fields(block: &str) -> Headers {
    let mut headers = Headers::new();
    for line in block.split("\r\n") {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim(), value.trim());
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const HEAD: &[u8] = b"post /upload?x=1 HTTP/1.1\r\nHost: example.test\r\nContent-Length: 5\r\n\r\nhello";

    #[test]
    fn frames_head_and_reports_body_offset() {
        let framed = frame_head(HEAD).expect("valid head").expect("complete head");
        assert_eq!(framed.head.method, "POST");
        assert_eq!(framed.head.uri, "/upload?x=1");
        assert_eq!(framed.head.version, "HTTP/1.1");
        assert_eq!(framed.head.headers.get("host"), Some("example.test"));
        assert_eq!(framed.head.content_length(), 5);
        assert_eq!(&HEAD[framed.body_offset..], b"hello");
    }

    #[rstest]
    #[case(b"GET / HTTP/1.1\r\nHost: a\r\n".as_slice())]
    #[case(b"GET / HTTP/1.1\r\n\r".as_slice())]
    #[case(b"".as_slice())]
    fn incomplete_head_needs_more_bytes(#[case] buf: &[u8]) {
        assert_eq!(frame_head(buf), Ok(None));
    }

    #[rstest]
    #[case("GET /")]
    #[case("GET")]
    #[case("")]
    fn short_request_line_is_rejected(#[case] line: &str) {
        assert_eq!(
            parse_request_line(line),
            Err(FramerError::MalformedRequestLine {
                line: line.to_owned()
            })
        );
    }

    #[test]
    fn extra_request_line_tokens_are_ignored() {
        let (method, uri, version) = parse_request_line("get /a HTTP/1.0 trailing").expect("valid");
        assert_eq!(
            (method.as_str(), uri.as_str(), version.as_str()),
            ("GET", "/a", "HTTP/1.0")
        );
    }

    #[test]
    fn header_fields_skip_colonless_lines_and_keep_last_value() {
        let headers = parse_header_fields("A: 1\r\nnonsense\r\nb :  two words \r\na: 3\r\nX: y:z");
        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get("A"), Some("3"));
        assert_eq!(headers.get("B"), Some("two words"));
        assert_eq!(headers.get("x"), Some("y:z"));
        let names: Vec<_> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b", "X"]);
    }

    #[test]
    fn reparsing_yields_identical_headers() {
        let first = frame_head(HEAD).expect("valid").expect("complete");
        let second = frame_head(HEAD).expect("valid").expect("complete");
        assert_eq!(first, second);
    }

    #[rstest]
    #[case("Content-Length: abc", 0)]
    #[case("Content-Length:  42 ", 42)]
    #[case("content-length: 7", 7)]
    #[case("Host: x", 0)]
    fn content_length_defaults_to_zero(#[case] field: &str, #[case] expected: u64) {
        let head = RequestHead {
            method: "POST".into(),
            uri: "/".into(),
            version: "HTTP/1.1".into(),
            headers: parse_header_fields(field),
        };
        assert_eq!(head.content_length(), expected);
    }

    #[test]
    fn non_utf8_head_is_rejected() {
        let buf = b"GET /\xff HTTP/1.1\r\n\r\n";
        assert_eq!(frame_head(buf), Err(FramerError::HeadNotUtf8));
    }

    #[test]
    fn request_line_colon_is_not_a_header() {
        let framed = frame_head(b"GET http://h:80/ HTTP/1.1\r\n\r\n")
            .expect("valid")
            .expect("complete");
        assert!(framed.head.headers.is_empty());
    }
}
