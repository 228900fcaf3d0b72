//! Fetch one message body, decode it and store it.

use mailpull_imap::{Credentials, FetchOutcome, Security, SeqNum, fetch_raw_message};
use mailpull_mime::{DecodedBody, extract_body};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::validation::validate_request;
use crate::settings::FetchSettings;
use crate::store::BodyRepository;
use crate::{Error, Result};

/// Folder used when the request names none.
const DEFAULT_FOLDER: &str = "INBOX";

/// Error text for a locator that matched nothing.
const NOT_FOUND_MESSAGE: &str = "Email not found on server";

/// Input of the fetch-email-body operation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchBodyRequest {
    /// IMAP server host.
    #[serde(default)]
    pub imap_host: String,
    /// IMAP server port. Defaults from `imap_secure`.
    #[serde(default)]
    pub imap_port: Option<u32>,
    /// Whether to use TLS. Defaults to true.
    #[serde(default)]
    pub imap_secure: Option<bool>,
    /// Mailbox owner; also the login name.
    #[serde(default)]
    pub email: String,
    /// Mailbox password.
    #[serde(default)]
    pub email_password: String,
    /// Folder to search. Defaults to `INBOX`.
    #[serde(default)]
    pub folder: Option<String>,
    /// Message locator, in any of its accepted forms.
    #[serde(default)]
    pub message_id: String,
}

impl std::fmt::Debug for FetchBodyRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchBodyRequest")
            .field("imap_host", &self.imap_host)
            .field("imap_port", &self.imap_port)
            .field("imap_secure", &self.imap_secure)
            .field("email", &self.email)
            .field("email_password", &"[REDACTED]")
            .field("folder", &self.folder)
            .field("message_id", &self.message_id)
            .finish()
    }
}

impl FetchBodyRequest {
    /// Parses a request from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serde` if the body is not a JSON object of the right shape.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Connection security requested.
    #[must_use]
    pub fn security(&self) -> Security {
        Security::from_tls_flag(self.imap_secure.unwrap_or(true))
    }

    /// Port to connect to, falling back to the default for the security mode.
    ///
    /// Only meaningful once the request has been validated.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.imap_port
            .and_then(|port| u16::try_from(port).ok())
            .unwrap_or_else(|| self.security().default_port())
    }

    /// Folder to select.
    #[must_use]
    pub fn folder(&self) -> &str {
        self.folder.as_deref().unwrap_or(DEFAULT_FOLDER)
    }
}

/// Output of the fetch-email-body operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchBodyResponse {
    /// Whether the body was fetched and stored.
    pub success: bool,
    /// Sequence number the message was fetched at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u32>,
    /// Whether the message appears to carry attachments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_attachments: Option<bool>,
    /// Whether a text or HTML body was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_body: Option<bool>,
    /// What went wrong.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FetchBodyResponse {
    fn found(seq: SeqNum, body: &DecodedBody) -> Self {
        Self {
            success: true,
            seq: Some(seq.get()),
            has_attachments: Some(body.has_attachments),
            has_body: Some(body.has_body()),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Outcome class of a fetch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// Body fetched and stored.
    Ok,
    /// The request was malformed.
    BadRequest,
    /// The locator matched no message.
    NotFound,
    /// Anything else: connection, login, folder, framing or storage failure.
    InternalError,
}

impl ResponseStatus {
    /// HTTP status code for this outcome.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::InternalError => 500,
        }
    }
}

/// Parses a JSON request body and handles it.
pub async fn handle_fetch_body_json(
    body: &[u8],
    settings: &FetchSettings,
    store: &BodyRepository,
) -> (ResponseStatus, FetchBodyResponse) {
    match FetchBodyRequest::from_json(body) {
        Ok(request) => handle_fetch_body(&request, settings, store).await,
        Err(e) => {
            warn!("Rejected malformed fetch request: {e}");
            (ResponseStatus::BadRequest, FetchBodyResponse::failed(e.to_string()))
        }
    }
}

/// Fetches, decodes and stores one message body.
///
/// Never fails: every outcome is folded into a status and a response.
pub async fn handle_fetch_body(
    request: &FetchBodyRequest,
    settings: &FetchSettings,
    store: &BodyRepository,
) -> (ResponseStatus, FetchBodyResponse) {
    if let Err(errors) = validate_request(request) {
        let e = Error::from(errors);
        warn!("Rejected fetch request: {e}");
        return (ResponseStatus::BadRequest, FetchBodyResponse::failed(e.to_string()));
    }

    info!(
        "Fetching body of {} for {} from {}",
        request.message_id, request.email, request.imap_host
    );

    match fetch_and_store(request, settings, store).await {
        Ok(Some((seq, body))) => {
            info!(
                "Stored body of {} (seq {seq}, attachments: {})",
                request.message_id, body.has_attachments
            );
            (ResponseStatus::Ok, FetchBodyResponse::found(seq, &body))
        }
        Ok(None) => {
            info!("No message matches {}", request.message_id);
            (
                ResponseStatus::NotFound,
                FetchBodyResponse::failed(NOT_FOUND_MESSAGE),
            )
        }
        Err(e) => {
            warn!("Fetching {} failed: {e}", request.message_id);
            (
                ResponseStatus::InternalError,
                FetchBodyResponse::failed(e.to_string()),
            )
        }
    }
}

async fn fetch_and_store(
    request: &FetchBodyRequest,
    settings: &FetchSettings,
    store: &BodyRepository,
) -> Result<Option<(SeqNum, DecodedBody)>> {
    let config = settings.imap_config(&request.imap_host, request.port(), request.security());
    let credentials = Credentials::new(&request.email, &request.email_password);

    let outcome =
        fetch_raw_message(&config, &credentials, request.folder(), &request.message_id).await?;

    let FetchOutcome::Found { seq, raw } = outcome else {
        return Ok(None);
    };

    let body = extract_body(&raw);
    store
        .save_body(&request.email, &request.message_id, &body)
        .await?;

    Ok(Some((seq, body)))
}
