//! Attachment heuristic.
//!
//! Works on the whole raw message text rather than the parsed parts, so it
//! also sees attachments inside nested multiparts.

use std::sync::LazyLock;

use regex::Regex;

#[allow(clippy::expect_used)]
static DISPOSITION_ATTACHMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)content-disposition:\s*attachment").expect("disposition pattern")
});

#[allow(clippy::expect_used)]
static NAME_PARAMETER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i);\s*(?:file)?name\*?=").expect("name parameter pattern"));

#[allow(clippy::expect_used)]
static IMAGE_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)content-type:\s*image/").expect("image type pattern"));

#[allow(clippy::expect_used)]
static CONTENT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)content-id:\s*<[^>\r\n]*>").expect("content id pattern"));

/// Returns true if the message appears to carry an attachment.
///
/// Any of these counts:
/// - a `Content-Disposition: attachment` header
/// - a `filename=` or `name=` parameter (RFC 2231 `*=` forms included)
/// - an `image/*` part together with a `Content-ID: <...>` header
#[must_use]
pub fn has_attachments(message: &str) -> bool {
    DISPOSITION_ATTACHMENT.is_match(message)
        || NAME_PARAMETER.is_match(message)
        || (IMAGE_TYPE.is_match(message) && CONTENT_ID.is_match(message))
}
