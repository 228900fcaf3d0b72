//! IMAP connection management.
//!
//! This module provides connection handling for IMAP servers, including:
//! - Configuration (host, port, security mode, timeouts)
//! - TLS/plaintext stream abstraction
//! - Timeout-bounded buffered reading
//! - The session state machine

mod config;
mod reader;
mod session;
mod stream;

pub use config::{Config, ConfigBuilder, DEFAULT_MAX_LITERAL_SIZE, Security};
pub use reader::ResponseReader;
pub use session::{Session, SessionState};
pub use stream::{ImapStream, connect, connect_plain, connect_tls};
