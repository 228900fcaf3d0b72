//! Body extraction.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::attachment::has_attachments;
use crate::html::html_to_text;
use crate::message::{ParsedMessage, Part};

/// Decoded bodies of a message.
///
/// Missing bodies are empty strings, never absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct DecodedBody {
    /// Plain-text body, or the HTML rendered as text when there is none.
    pub text: String,
    /// HTML body.
    pub html: String,
    /// Whether the message appears to carry attachments.
    pub has_attachments: bool,
}

impl DecodedBody {
    /// Returns true if either body is non-empty.
    #[must_use]
    pub fn has_body(&self) -> bool {
        !self.text.is_empty() || !self.html.is_empty()
    }
}

/// Extracts the text and HTML bodies of a raw RFC 5322 message.
///
/// The first `text/plain` part fills the text slot and the first `text/html`
/// part the HTML slot. A single-part message goes to the HTML slot when it is
/// `text/html` and to the text slot otherwise. Both results are trimmed.
/// Never fails: undecodable content is passed through.
#[must_use]
pub fn extract_body(raw: &[u8]) -> DecodedBody {
    let message = String::from_utf8_lossy(raw);
    let has_attachments = has_attachments(&message);

    let (text, html) = match ParsedMessage::parse(&message) {
        ParsedMessage::SinglePart(part) => {
            let decoded = part.decoded();
            if part.content_type.is_text_html() {
                (String::new(), decoded)
            } else {
                (decoded, String::new())
            }
        }
        ParsedMessage::Multipart { parts, .. } => (
            first_decoded(&parts, |part| part.content_type.is_text_plain()),
            first_decoded(&parts, |part| part.content_type.is_text_html()),
        ),
    };

    let html = html.trim().to_string();
    let mut text = text.trim().to_string();
    if text.is_empty() && !html.is_empty() {
        text = html_to_text(&html);
    }

    DecodedBody {
        text,
        html,
        has_attachments,
    }
}

fn first_decoded(parts: &[Part], wanted: impl Fn(&Part) -> bool) -> String {
    parts
        .iter()
        .find(|&part| wanted(part))
        .map(Part::decoded)
        .unwrap_or_default()
}
