//! Error types for the IMAP fetcher.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while fetching a message.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or encryption error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid DNS name for TLS.
    #[error("Invalid DNS name: {0}")]
    InvalidDnsName(#[from] rustls::pki_types::InvalidDnsNameError),

    /// Connecting or reading the greeting failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// LOGIN was not answered with OK.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// SELECT was not answered with OK.
    #[error("Mailbox selection failed: {0}")]
    Mailbox(String),

    /// Server sent BYE (disconnecting).
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// A command did not complete before its deadline.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The FETCH response did not carry the expected `{N}` literal.
    #[error("Literal framing error: {0}")]
    Literal(String),

    /// Command issued from a session state that does not permit it.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Protocol violation or unexpected data.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
