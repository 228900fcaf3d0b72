//! Request validation.

use super::fetch_body::FetchBodyRequest;
use crate::Error;

/// Validation error for a fetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// IMAP host is empty.
    EmptyImapHost,
    /// IMAP port is outside 1-65535.
    InvalidImapPort,
    /// Email address is empty.
    EmptyEmail,
    /// Password is empty.
    EmptyPassword,
    /// Folder is present but empty.
    EmptyFolder,
    /// Message locator is empty.
    EmptyMessageId,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::EmptyImapHost => "IMAP server is required",
            Self::InvalidImapPort => "IMAP port must be 1-65535",
            Self::EmptyEmail => "Email address is required",
            Self::EmptyPassword => "Email password is required",
            Self::EmptyFolder => "Folder must not be empty",
            Self::EmptyMessageId => "Message ID is required",
        }
    }

    /// Get the request field this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyImapHost => "imapHost",
            Self::InvalidImapPort => "imapPort",
            Self::EmptyEmail => "email",
            Self::EmptyPassword => "emailPassword",
            Self::EmptyFolder => "folder",
            Self::EmptyMessageId => "messageId",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

impl From<Vec<ValidationError>> for Error {
    fn from(errors: Vec<ValidationError>) -> Self {
        let message = errors
            .iter()
            .map(ValidationError::message)
            .collect::<Vec<_>>()
            .join("; ");
        Self::Invalid(message)
    }
}

/// Validate a fetch request.
///
/// # Errors
///
/// Returns every `ValidationError` found, in field order.
pub fn validate_request(request: &FetchBodyRequest) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if request.imap_host.trim().is_empty() {
        errors.push(ValidationError::EmptyImapHost);
    }
    if let Some(port) = request.imap_port
        && !(1..=65535).contains(&port)
    {
        errors.push(ValidationError::InvalidImapPort);
    }
    if request.email.trim().is_empty() {
        errors.push(ValidationError::EmptyEmail);
    }
    // Passwords may legitimately contain only spaces.
    if request.email_password.is_empty() {
        errors.push(ValidationError::EmptyPassword);
    }
    if request.folder.as_deref().is_some_and(|folder| folder.trim().is_empty()) {
        errors.push(ValidationError::EmptyFolder);
    }
    if request.message_id.trim().is_empty() {
        errors.push(ValidationError::EmptyMessageId);
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
