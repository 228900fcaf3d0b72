//! MIME message structure.
//!
//! A message is parsed in a single pass: the top-level header block decides
//! between a single part and a multipart body, and a multipart body is cut
//! into parts on its boundary. Parts are never parsed further, so a nested
//! `multipart/*` part stays one opaque part.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::content_type::ContentType;
use crate::encoding::decode;
use crate::header::Headers;

#[allow(clippy::expect_used)]
static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n\r?\n").expect("blank line pattern"));

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    #[default]
    SevenBit,
    /// 8-bit binary.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses transfer encoding from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// One body part, still transfer-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Parsed `Content-Type`.
    pub content_type: ContentType,
    /// Parsed `Content-Transfer-Encoding`.
    pub transfer_encoding: TransferEncoding,
    /// Raw content after the header block.
    pub content: String,
}

impl Part {
    /// Builds a part from a header block and its content.
    #[must_use]
    pub fn new(headers: Headers, content: impl Into<String>) -> Self {
        let content_type = headers
            .get("content-type")
            .map(ContentType::parse)
            .unwrap_or_default();
        let transfer_encoding = headers
            .get("content-transfer-encoding")
            .map(TransferEncoding::parse)
            .unwrap_or_default();

        Self {
            headers,
            content_type,
            transfer_encoding,
            content: content.into(),
        }
    }

    /// Parses a part from its raw text: headers, blank line, content.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let (headers, content) = split_headers_body(text);
        Self::new(Headers::parse(headers), content)
    }

    /// Returns the content with its transfer encoding undone.
    #[must_use]
    pub fn decoded(&self) -> String {
        decode(&self.content, self.transfer_encoding)
    }
}

/// A parsed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedMessage {
    /// The whole message is one part.
    SinglePart(Part),
    /// A multipart body split on its boundary.
    Multipart {
        /// Boundary from the top-level `Content-Type`.
        boundary: String,
        /// Parts in message order.
        parts: Vec<Part>,
    },
}

impl ParsedMessage {
    /// Parses a complete message.
    ///
    /// A top-level `Content-Type` with a non-empty `boundary` parameter makes
    /// the message multipart; anything else is a single part.
    #[must_use]
    pub fn parse(message: &str) -> Self {
        let (header_text, body) = split_headers_body(message);
        let headers = Headers::parse(header_text);

        let boundary = headers
            .get("content-type")
            .map(ContentType::parse)
            .and_then(|ct| ct.boundary().map(str::to_string));

        match boundary {
            Some(boundary) => {
                let parts = split_multipart(body, &boundary)
                    .into_iter()
                    .map(Part::parse)
                    .collect();
                Self::Multipart { boundary, parts }
            }
            None => Self::SinglePart(Part::new(headers, body)),
        }
    }

    /// Returns the parts in order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        match self {
            Self::SinglePart(part) => std::slice::from_ref(part),
            Self::Multipart { parts, .. } => parts,
        }
    }
}

/// Splits raw text at the first blank line into headers and body.
///
/// Text starting with a line break has no headers. Text without a blank line
/// is all headers.
#[must_use]
pub fn split_headers_body(text: &str) -> (&str, &str) {
    if let Some(rest) = text.strip_prefix("\r\n") {
        return ("", rest);
    }
    if let Some(rest) = text.strip_prefix('\n') {
        return ("", rest);
    }

    BLANK_LINE
        .find(text)
        .map_or((text, ""), |m| (&text[..m.start()], &text[m.end()..]))
}

/// Cuts a multipart body into raw part texts.
///
/// The prelude before the first delimiter is dropped, as is everything from
/// the closing `--boundary--` on. The line break ending each delimiter line
/// and the one preceding the next delimiter belong to the delimiters, not
/// the part.
fn split_multipart<'a>(body: &'a str, boundary: &str) -> Vec<&'a str> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();

    for segment in body.split(delimiter.as_str()).skip(1) {
        if segment.starts_with("--") {
            break;
        }

        // Rest of the delimiter line (transport padding and line break)
        let segment = segment
            .find('\n')
            .map_or("", |newline| &segment[newline + 1..]);

        let segment = segment
            .strip_suffix("\r\n")
            .or_else(|| segment.strip_suffix('\n'))
            .unwrap_or(segment);

        parts.push(segment);
    }

    parts
}
