//! Body storage models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBody {
    /// Mailbox owner the record belongs to.
    pub email: String,
    /// Locator the record was fetched with.
    pub message_id: String,
    /// Plain-text body.
    pub body_text: String,
    /// HTML body.
    pub body_html: String,
    /// Whether the message appears to carry attachments.
    pub has_attachments: bool,
    /// When the body was last written.
    pub updated_at: DateTime<Utc>,
}
