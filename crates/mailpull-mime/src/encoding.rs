//! Content-Transfer-Encoding decoding.
//!
//! Both decoders are total: input they cannot make sense of comes back
//! unchanged (base64) or with the offending escapes left verbatim
//! (quoted-printable). Decoded bytes are read as UTF-8, replacing invalid
//! sequences.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::message::TransferEncoding;

/// Decodes `content` according to its transfer encoding.
///
/// `7bit`, `8bit`, `binary` and unknown encodings pass through untouched.
#[must_use]
pub fn decode(content: &str, encoding: TransferEncoding) -> String {
    match encoding {
        TransferEncoding::Base64 => decode_base64_lossy(content),
        TransferEncoding::QuotedPrintable => decode_quoted_printable(content),
        TransferEncoding::SevenBit | TransferEncoding::EightBit | TransferEncoding::Binary => {
            content.to_string()
        }
    }
}

/// Decodes base64 text, or returns it unchanged if it does not look like
/// base64.
///
/// Whitespace (line breaks included) is ignored. The remaining characters
/// must all be in the standard alphabet and their count a multiple of four.
#[must_use]
pub fn decode_base64_lossy(content: &str) -> String {
    let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();

    let plausible = cleaned.len() % 4 == 0
        && cleaned
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='));
    if !plausible {
        return content.to_string();
    }

    STANDARD.decode(cleaned.as_bytes()).map_or_else(
        |_| content.to_string(),
        |bytes| String::from_utf8_lossy(&bytes).into_owned(),
    )
}

/// Decodes quoted-printable text (RFC 2045).
///
/// Soft line breaks (`=` at end of line) are removed and `=XX` becomes the
/// byte `0xXX`. An `=` not followed by two hex digits or a line break is kept
/// as is.
#[must_use]
pub fn decode_quoted_printable(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'=' {
            match (bytes.get(i + 1), bytes.get(i + 2)) {
                // Soft line break
                (Some(b'\r'), Some(b'\n')) => {
                    i += 3;
                    continue;
                }
                (Some(b'\n'), _) => {
                    i += 2;
                    continue;
                }
                (Some(&high), Some(&low)) => {
                    if let (Some(high), Some(low)) = (hex_value(high), hex_value(low)) {
                        out.push((high << 4) | low);
                        i += 3;
                        continue;
                    }
                }
                _ => {}
            }
        }

        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

const fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base64_decode() {
        assert_eq!(decode_base64_lossy("SGVsbG8sIFdvcmxkIQ=="), "Hello, World!");
    }

    #[test]
    fn test_base64_ignores_line_breaks() {
        assert_eq!(decode_base64_lossy("SGVsbG8s\r\nIFdvcmxk\r\nIQ==\r\n"), "Hello, World!");
    }

    #[test]
    fn test_base64_rejects_foreign_alphabet() {
        let text = "Not base64 at all!";
        assert_eq!(decode_base64_lossy(text), text);
    }

    #[test]
    fn test_base64_rejects_bad_length() {
        assert_eq!(decode_base64_lossy("SGVsbG8"), "SGVsbG8");
    }

    #[test]
    fn test_base64_misplaced_padding_returns_input() {
        assert_eq!(decode_base64_lossy("SG=sbG8s"), "SG=sbG8s");
    }

    #[test]
    fn test_base64_invalid_utf8_is_replaced() {
        // 0xFF 0xFE
        assert_eq!(decode_base64_lossy("//4="), "\u{FFFD}\u{FFFD}");
    }

    #[test]
    fn test_quoted_printable_utf8() {
        assert_eq!(decode_quoted_printable("Caf=C3=A9"), "Café");
        assert_eq!(decode_quoted_printable("caf=c3=a9"), "café");
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        assert_eq!(decode_quoted_printable("Hello, =\r\nWorld=\n!"), "Hello, World!");
    }

    #[test]
    fn test_quoted_printable_malformed_kept() {
        assert_eq!(decode_quoted_printable("100% =ZZ off ="), "100% =ZZ off =");
        assert_eq!(decode_quoted_printable("a=4"), "a=4");
    }

    #[test]
    fn test_quoted_printable_keeps_non_ascii_input() {
        assert_eq!(decode_quoted_printable("Héllo =3D Wørld"), "Héllo = Wørld");
    }

    #[test]
    fn test_decode_dispatch() {
        assert_eq!(decode("SGk=", TransferEncoding::Base64), "Hi");
        assert_eq!(decode("H=69", TransferEncoding::QuotedPrintable), "Hi");
        assert_eq!(decode("H=69", TransferEncoding::SevenBit), "H=69");
    }

    proptest! {
        #[test]
        fn prop_quoted_printable_is_total(text in ".*") {
            let decoded = decode_quoted_printable(&text);
            prop_assert!(decoded.len() <= text.len() * 3);
        }

        #[test]
        fn prop_quoted_printable_plain_ascii_unchanged(text in "[a-zA-Z0-9 .,!?]*") {
            prop_assert_eq!(decode_quoted_printable(&text), text);
        }

        #[test]
        fn prop_base64_never_panics(text in ".*") {
            let _ = decode_base64_lossy(&text);
        }
    }
}
