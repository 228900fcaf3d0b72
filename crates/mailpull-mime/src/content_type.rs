//! MIME content type handling.

use std::collections::HashMap;

/// MIME content type with parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentType {
    /// Lowercased `type/subtype`, empty when the header is missing.
    pub media_type: String,
    /// Parameters keyed by lowercased name, values unquoted.
    pub parameters: HashMap<String, String>,
}

impl ContentType {
    /// Parses a `Content-Type` header value.
    ///
    /// The media type is everything up to the first `;`. Parameters may be
    /// quoted, and a quoted value may itself contain `;`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let mut pieces = split_parameters(value).into_iter();
        let media_type = pieces
            .next()
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_default();

        let parameters = pieces
            .filter_map(|param| {
                let (key, value) = param.split_once('=')?;
                let key = key.trim().to_lowercase();
                let value = value.trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                Some((key, value.to_string()))
            })
            .collect();

        Self {
            media_type,
            parameters,
        }
    }

    /// Gets a parameter value.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    /// Returns the multipart boundary, if present and non-empty.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary").filter(|b| !b.is_empty())
    }

    /// Returns true for `text/plain`.
    #[must_use]
    pub fn is_text_plain(&self) -> bool {
        self.media_type == "text/plain"
    }

    /// Returns true for `text/html`.
    #[must_use]
    pub fn is_text_html(&self) -> bool {
        self.media_type == "text/html"
    }

    /// Returns true for any `multipart/*` type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.media_type.starts_with("multipart/")
    }
}

/// Splits on `;` outside double quotes.
fn split_parameters(value: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                pieces.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(&value[start..]);
    pieces
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let ct = ContentType::parse("text/plain");
        assert_eq!(ct.media_type, "text/plain");
        assert!(ct.is_text_plain());
        assert!(ct.parameters.is_empty());
    }

    #[test]
    fn test_parse_with_parameters() {
        let ct = ContentType::parse("Text/HTML; Charset=\"UTF-8\"");
        assert!(ct.is_text_html());
        assert_eq!(ct.parameter("charset"), Some("UTF-8"));
    }

    #[test]
    fn test_quoted_boundary() {
        let ct = ContentType::parse("multipart/alternative; boundary=\"=_a;b c\"");
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("=_a;b c"));
    }

    #[test]
    fn test_unquoted_boundary() {
        let ct = ContentType::parse("multipart/mixed; boundary=XYZ123; charset=us-ascii");
        assert_eq!(ct.boundary(), Some("XYZ123"));
    }

    #[test]
    fn test_empty_boundary_ignored() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"\"");
        assert_eq!(ct.boundary(), None);
    }

    #[test]
    fn test_empty_value() {
        let ct = ContentType::parse("");
        assert_eq!(ct.media_type, "");
        assert_eq!(ct.boundary(), None);
    }
}
