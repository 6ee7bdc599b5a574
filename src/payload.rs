//! Request body decoding by content type.
//!
//! Form submissions (`application/x-www-form-urlencoded` and
//! `multipart/form-data`) decode into a field map; every other content
//! type, including unknown or missing ones, is passed through untouched as
//! raw bytes. Decoding never fails: malformed multipart parts are skipped.

use std::collections::HashMap;

use bytes::Bytes;
use memchr::memmem;

/// Media type of URL-encoded forms.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
/// Media type of multipart forms.
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Text media types passed through as raw bytes.
pub const TEXT_MEDIA_TYPES: &[&str] = &[
    "text/plain",
    "application/json",
    "application/javascript",
    "text/html",
    "application/xml",
];

/// An uploaded file extracted from a multipart body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePart {
    /// File name supplied by the client.
    pub filename: String,
    /// Declared content type of the file.
    pub content_type: String,
    /// File content.
    pub data: Bytes,
}

/// A single decoded form field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormValue {
    /// A plain text field.
    Text(String),
    /// An uploaded file.
    File(FilePart),
}

impl FormValue {
    /// The text value, if this is a text field.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::File(_) => None,
        }
    }

    /// The file part, if this is a file field.
    #[must_use]
    pub fn as_file(&self) -> Option<&FilePart> {
        match self {
            Self::File(file) => Some(file),
            Self::Text(_) => None,
        }
    }
}

/// Decoded form fields keyed by name.
pub type FormData = HashMap<String, FormValue>;

/// Structured interpretation of a request body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// Fields of a form submission.
    Form(FormData),
    /// Opaque body bytes.
    Raw(Bytes),
}

impl Payload {
    /// Field map of a form payload.
    #[must_use]
    pub fn form(&self) -> Option<&FormData> {
        match self {
            Self::Form(form) => Some(form),
            Self::Raw(_) => None,
        }
    }

    /// Bytes of a raw payload.
    #[must_use]
    pub fn raw(&self) -> Option<&Bytes> {
        match self {
            Self::Raw(bytes) => Some(bytes),
            Self::Form(_) => None,
        }
    }
}

/// Decode `body` according to the `Content-Type` header value.
#[must_use]
pub fn decode(content_type: Option<&str>, body: Bytes) -> Payload {
    let Some(content_type) = content_type else {
        return Payload::Raw(body);
    };
    let media = media_type(content_type);
    if media.eq_ignore_ascii_case(FORM_URLENCODED) {
        Payload::Form(decode_urlencoded(&body))
    } else if media.eq_ignore_ascii_case(MULTIPART_FORM_DATA) {
        match multipart_boundary(content_type) {
            Some(boundary) => Payload::Form(decode_multipart(&body, boundary)),
            None => Payload::Raw(body),
        }
    } else {
        // Text types and everything unrecognised share the opaque path.
        Payload::Raw(body)
    }
}

/// Whether `content_type` names one of [`TEXT_MEDIA_TYPES`].
#[must_use]
pub fn is_text_media_type(content_type: &str) -> bool {
    let media = media_type(content_type);
    TEXT_MEDIA_TYPES
        .iter()
        .any(|known| media.eq_ignore_ascii_case(known))
}

/// The media type of a `Content-Type` value, without parameters.
#[must_use]
pub fn media_type(content_type: &str) -> &str {
    content_type
        .split_once(';')
        .map_or(content_type, |(media, _)| media)
        .trim()
}

/// The `boundary` parameter of a multipart `Content-Type` value.
#[must_use]
pub fn multipart_boundary(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|boundary| !boundary.is_empty())
}

/// Decode `name=value` pairs separated by `&`.
///
/// Values are percent-decoded with `+` read as a space; a pair without `=`
/// yields an empty value and repeated names keep the last value.
#[must_use]
pub fn decode_urlencoded(body: &[u8]) -> FormData {
    url::form_urlencoded::parse(body)
        .map(|(name, value)| (name.into_owned(), FormValue::Text(value.into_owned())))
        .collect()
}

/// Decode the parts of a multipart body split on `boundary`.
///
/// Parts that are neither a plain field nor a file field are dropped.
#[must_use]
pub fn decode_multipart(body: &Bytes, boundary: &str) -> FormData {
    let mut form = FormData::new();
    let mut start = 0;
    for at in memmem::find_iter(body, boundary.as_bytes()).chain([body.len()]) {
        if at < start {
            continue;
        }
        if let Some((name, value)) = parse_part(&body.slice(start..at)) {
            form.insert(name, value);
        }
        start = at + boundary.len();
    }
    form
}

const DISPOSITION: &[u8] = b"Content-Disposition: form-data; name=\"";
const FILENAME: &[u8] = b"; filename=\"";
const PART_CONTENT_TYPE: &[u8] = b"Content-Type:";
const BLANK_LINE: &[u8] = b"\r\n\r\n";

/// Match one part against the plain-field and file-field shapes.
fn parse_part(part: &Bytes) -> Option<(String, FormValue)> {
    let mut cursor = find_ignore_ascii_case(part, DISPOSITION)? + DISPOSITION.len();
    let name = quoted(part, &mut cursor)?;

    if starts_with_ignore_ascii_case(&part[cursor..], BLANK_LINE) {
        let value = value_until_last_crlf(part, cursor + BLANK_LINE.len())?;
        let text = String::from_utf8_lossy(&value).into_owned();
        return Some((name, FormValue::Text(text)));
    }

    if !starts_with_ignore_ascii_case(&part[cursor..], FILENAME) {
        return None;
    }
    cursor += FILENAME.len();
    let filename = quoted(part, &mut cursor)?;
    cursor = expect(part, cursor, b"\r\n")?;
    cursor = expect(part, cursor, PART_CONTENT_TYPE)?;
    let line_end = cursor + memmem::find(&part[cursor..], b"\r\n")?;
    let content_type = std::str::from_utf8(&part[cursor..line_end]).ok()?.trim();
    if content_type.is_empty() {
        return None;
    }
    let content_type = content_type.to_owned();
    cursor = expect(part, line_end, BLANK_LINE)?;
    let data = value_until_last_crlf(part, cursor)?;
    Some((
        name,
        FormValue::File(FilePart {
            filename,
            content_type,
            data,
        }),
    ))
}

/// Read a non-empty value up to the next `"` and step past the quote.
fn quoted(part: &[u8], cursor: &mut usize) -> Option<String> {
    let rest = &part[*cursor..];
    let end = memchr::memchr(b'"', rest).filter(|end| *end > 0)?;
    let value = std::str::from_utf8(&rest[..end]).ok()?.to_owned();
    *cursor += end + 1;
    Some(value)
}

fn expect(part: &[u8], cursor: usize, token: &[u8]) -> Option<usize> {
    starts_with_ignore_ascii_case(&part[cursor..], token).then_some(cursor + token.len())
}

/// Bytes from `from` up to the last CRLF of the part.
fn value_until_last_crlf(part: &Bytes, from: usize) -> Option<Bytes> {
    let end = memmem::rfind(&part[from..], b"\r\n")?;
    Some(part.slice(from..from + end))
}

fn starts_with_ignore_ascii_case(hay: &[u8], needle: &[u8]) -> bool {
    hay.len() >= needle.len() && hay[..needle.len()].eq_ignore_ascii_case(needle)
}

fn find_ignore_ascii_case(hay: &[u8], needle: &[u8]) -> Option<usize> {
    hay.windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}
