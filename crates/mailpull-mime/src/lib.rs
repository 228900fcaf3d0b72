//! # mailpull-mime
//!
//! Best-effort body extraction from raw MIME messages.
//!
//! ## Features
//!
//! - **Body extraction**: first `text/plain` and first `text/html` part
//! - **Decoding**: Base64 and Quoted-Printable, tolerant of bad input
//! - **Attachment hint**: disposition, file name and inline image checks
//! - **HTML fallback**: a text rendering when only HTML is present
//! - **Multipart**: one level of boundary splitting, nested parts kept opaque
//!
//! Nothing here returns an error. Malformed input degrades to passed-through
//! text or empty strings.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailpull_mime::extract_body;
//!
//! let raw = b"Content-Type: text/html\r\n\r\n<p>Hi <b>there</b></p>";
//! let body = extract_body(raw);
//!
//! assert_eq!(body.text, "Hi there");
//! assert_eq!(body.html, "<p>Hi <b>there</b></p>");
//! assert!(!body.has_attachments);
//! ```
//!
//! ### Encoding/Decoding
//!
//! ```ignore
//! use mailpull_mime::encoding::{decode_base64_lossy, decode_quoted_printable};
//!
//! assert_eq!(decode_quoted_printable("Caf=C3=A9"), "Café");
//! assert_eq!(decode_base64_lossy("SGk="), "Hi");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod attachment;
mod content_type;
mod extract;
mod header;
mod html;
mod message;

pub mod encoding;

pub use attachment::has_attachments;
pub use content_type::ContentType;
pub use extract::{DecodedBody, extract_body};
pub use header::Headers;
pub use html::html_to_text;
pub use message::{ParsedMessage, Part, TransferEncoding, split_headers_body};
