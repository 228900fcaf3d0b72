//! IMAP session state machine.
//!
//! A `Session` owns one connection and issues commands strictly one at a
//! time. It tracks where the connection is in the protocol and rejects
//! commands the current state does not allow:
//!
//! ```text
//! Connected ── login() ──→ Authenticated ── select() ──→ Selected
//!     │                         ▲                           │
//!     └── * PREAUTH greeting ───┘                           │
//!                                                           ▼
//!            (any state) ─────── logout() ─────────────→ Closed
//! ```
//!
//! Every read is bounded: the greeting by the greeting timeout, each tagged
//! command by the command timeout, and the tail of a FETCH by the drain
//! timeout.

#![allow(clippy::missing_errors_doc)]

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, warn};

use super::config::Config;
use super::reader::ResponseReader;
use super::stream::{self, ImapStream};
use crate::command::{Command, TagGenerator};
use crate::response::{
    Completion, GreetingKind, find_bye, find_greeting, find_literal_header,
    find_tagged_completion, parse_search,
};
use crate::types::{Credentials, SeqNum, Status};
use crate::{Error, Result};

/// Where the connection is in the protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Greeting received, not yet authenticated.
    Connected,
    /// Logged in (or pre-authenticated by the server).
    Authenticated,
    /// A mailbox is open.
    Selected {
        /// Name of the open mailbox.
        mailbox: String,
    },
    /// LOGOUT sent and the stream shut down.
    Closed,
}

impl SessionState {
    /// Returns `true` once logged in, with or without a mailbox open.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated | Self::Selected { .. })
    }

    /// Returns `true` if a mailbox is open.
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        matches!(self, Self::Selected { .. })
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Selected { mailbox } => write!(f, "selected ({mailbox})"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Result of one tagged command.
struct Exchange {
    status: Status,
    line: String,
    untagged: Vec<u8>,
}

/// A single IMAP connection.
pub struct Session<S> {
    reader: ResponseReader<S>,
    tags: TagGenerator,
    state: SessionState,
    command_timeout: Duration,
    drain_timeout: Duration,
    max_literal_size: usize,
}

impl Session<ImapStream> {
    /// Connects to the server described by `config` and reads its greeting.
    pub async fn connect(config: &Config) -> Result<Self> {
        let stream = stream::connect(config).await?;
        Self::from_stream(stream, config).await
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Starts a session over an already open stream.
    ///
    /// Waits for the server greeting. `* OK` leaves the session in
    /// [`SessionState::Connected`], `* PREAUTH` skips straight to
    /// [`SessionState::Authenticated`]. A `* BYE`, anything else, or silence
    /// past the greeting timeout is a connection error.
    pub async fn from_stream(stream: S, config: &Config) -> Result<Self> {
        let mut reader = ResponseReader::new(stream);

        let greeting = reader
            .read_until(config.greeting_timeout, find_greeting)
            .await?
            .ok_or_else(|| {
                Error::Connection(format!(
                    "no greeting from {} within {:?}",
                    config.address(),
                    config.greeting_timeout
                ))
            })?
            .map_err(|line| Error::Connection(format!("unexpected greeting: {line}")))?;

        reader.consume(greeting.end);

        let state = match greeting.kind {
            GreetingKind::Ok => SessionState::Connected,
            GreetingKind::PreAuth => SessionState::Authenticated,
            GreetingKind::Bye => {
                return Err(Error::Connection(format!(
                    "server refused connection: {}",
                    greeting.line
                )));
            }
        };
        debug!(greeting = %greeting.line, %state, "greeting received");

        Ok(Self {
            reader,
            tags: TagGenerator::default(),
            state,
            command_timeout: config.command_timeout,
            drain_timeout: config.drain_timeout,
            max_literal_size: config.max_literal_size,
        })
    }

    /// Returns the current protocol state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Authenticates with LOGIN.
    ///
    /// A session the server pre-authenticated is left as is. Any status
    /// other than OK is an [`Error::Auth`] carrying the server's line.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<()> {
        match self.state {
            SessionState::Connected => {}
            SessionState::Authenticated => {
                debug!("pre-authenticated, skipping LOGIN");
                return Ok(());
            }
            _ => return Err(self.not_allowed("LOGIN")),
        }

        let exchange = self
            .run(&Command::Login {
                username: credentials.username.clone(),
                password: credentials.password.clone(),
            })
            .await?;

        if !exchange.status.is_ok() {
            return Err(Error::Auth(exchange.line));
        }

        self.state = SessionState::Authenticated;
        debug!(username = %credentials.username, "logged in");
        Ok(())
    }

    /// Opens a mailbox with SELECT.
    ///
    /// Any status other than OK is an [`Error::Mailbox`] carrying the
    /// server's line, and leaves no mailbox selected.
    pub async fn select(&mut self, mailbox: &str) -> Result<()> {
        if !self.state.is_authenticated() {
            return Err(self.not_allowed("SELECT"));
        }

        let exchange = self
            .run(&Command::Select {
                mailbox: mailbox.to_string(),
            })
            .await?;

        if !exchange.status.is_ok() {
            self.state = SessionState::Authenticated;
            return Err(Error::Mailbox(exchange.line));
        }

        self.state = SessionState::Selected {
            mailbox: mailbox.to_string(),
        };
        debug!(mailbox, "mailbox selected");
        Ok(())
    }

    /// Runs `SEARCH HEADER <name> "<value>"` and returns the matching
    /// sequence numbers.
    ///
    /// A NO or BAD answer yields an empty result rather than an error.
    pub async fn search_header(&mut self, name: &str, value: &str) -> Result<Vec<SeqNum>> {
        if !self.state.is_selected() {
            return Err(self.not_allowed("SEARCH"));
        }

        let exchange = self
            .run(&Command::SearchHeader {
                name: name.to_string(),
                value: value.to_string(),
            })
            .await?;

        if !exchange.status.is_ok() {
            warn!(status = %exchange.status, line = %exchange.line, "search rejected");
            return Ok(Vec::new());
        }

        let hits: Vec<SeqNum> = parse_search(&exchange.untagged)
            .into_iter()
            .map(SeqNum)
            .collect();
        debug!(header = name, value, hits = hits.len(), "search finished");
        Ok(hits)
    }

    /// Fetches the complete raw message at `seq` with `BODY.PEEK[]`.
    ///
    /// The returned bytes are exactly the `{N}` literal the server announced.
    /// After the literal the tagged completion is drained so the connection
    /// stays usable; if it does not arrive within the drain timeout the
    /// literal is still returned.
    pub async fn fetch_body(&mut self, seq: SeqNum) -> Result<Bytes> {
        if !self.state.is_selected() {
            return Err(self.not_allowed("FETCH"));
        }

        let command = Command::FetchBody { seq };
        let tag = self.tags.next_tag();
        debug!(tag = %tag, command = command.name(), %seq, "sending");
        self.reader.write_command(&command.serialize(&tag)).await?;

        let header = self
            .reader
            .read_until(self.command_timeout, |buf| match find_literal_header(buf) {
                Some(header) => Some(Ok(header)),
                None => find_tagged_completion(buf, &tag).map(Err),
            })
            .await?;

        let header = match header {
            Some(Ok(header)) => header,
            Some(Err(completion)) => {
                self.reader.consume(completion.end);
                return Err(Error::Literal(format!(
                    "FETCH completed without a BODY[] literal: {}",
                    completion.line
                )));
            }
            None => {
                return Err(self.interrupted(
                    Error::Literal(format!(
                        "no BODY[] literal within {:?}",
                        self.command_timeout
                    )),
                ));
            }
        };

        if header.len > self.max_literal_size {
            return Err(Error::Literal(format!(
                "literal of {} bytes exceeds limit of {} bytes",
                header.len, self.max_literal_size
            )));
        }

        self.reader.consume(header.end);
        let Some(raw) = self
            .reader
            .read_exact(header.len, self.command_timeout)
            .await?
        else {
            return Err(Error::Literal(format!(
                "literal truncated: expected {} bytes, got {}",
                header.len,
                self.reader.buffered().len()
            )));
        };

        self.drain(&tag).await?;
        debug!(tag = %tag, %seq, bytes = raw.len(), "literal received");
        Ok(raw)
    }

    /// Sends LOGOUT and shuts the stream down.
    ///
    /// Never fails: problems are logged and the session ends up
    /// [`SessionState::Closed`] regardless.
    pub async fn logout(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }

        let tag = self.tags.next_tag();
        debug!(tag = %tag, command = "LOGOUT", "sending");
        match self
            .reader
            .write_command(&Command::Logout.serialize(&tag))
            .await
        {
            Ok(()) => {
                match self
                    .reader
                    .read_until(self.command_timeout, |buf| {
                        find_tagged_completion(buf, &tag)
                    })
                    .await
                {
                    Ok(Some(completion)) => {
                        self.reader.consume(completion.end);
                        debug!(line = %completion.line, "logged out");
                    }
                    Ok(None) => debug!("no LOGOUT completion, closing anyway"),
                    Err(e) => warn!(error = %e, "LOGOUT response unreadable"),
                }
            }
            Err(e) => warn!(error = %e, "LOGOUT failed"),
        }

        self.reader.shutdown().await;
        self.state = SessionState::Closed;
    }

    /// Sends a command and waits for its tagged completion.
    async fn run(&mut self, command: &Command) -> Result<Exchange> {
        let tag = self.tags.next_tag();
        debug!(tag = %tag, command = command.name(), "sending");
        self.reader.write_command(&command.serialize(&tag)).await?;

        let completion: Option<Completion> = self
            .reader
            .read_until(self.command_timeout, |buf| {
                find_tagged_completion(buf, &tag)
            })
            .await?;

        let Some(completion) = completion else {
            return Err(self.interrupted(Error::Timeout(self.command_timeout)));
        };

        let untagged = self.reader.buffered()[..completion.start].to_vec();
        self.reader.consume(completion.end);
        debug!(tag = %tag, status = %completion.status, "completed");

        Ok(Exchange {
            status: completion.status,
            line: completion.line,
            untagged,
        })
    }

    /// Waits for the FETCH completion after the literal.
    async fn drain(&mut self, tag: &str) -> Result<()> {
        let completion = self
            .reader
            .read_until(self.drain_timeout, |buf| find_tagged_completion(buf, tag))
            .await?;

        match completion {
            Some(completion) => {
                self.reader.consume(completion.end);
                if !completion.status.is_ok() {
                    warn!(line = %completion.line, "FETCH completed with non-OK status");
                }
            }
            None => warn!(
                tag,
                timeout = ?self.drain_timeout,
                "FETCH completion not seen, continuing"
            ),
        }
        Ok(())
    }

    /// Picks the error for a read that ended without its marker.
    ///
    /// A server BYE or a closed stream explains the silence better than the
    /// fallback.
    fn interrupted(&self, fallback: Error) -> Error {
        if let Some(line) = find_bye(self.reader.buffered()) {
            Error::Bye(line)
        } else if self.reader.is_closed() {
            Error::Connection("connection closed by server".to_string())
        } else {
            fallback
        }
    }

    fn not_allowed(&self, command: &str) -> Error {
        Error::InvalidState(format!("{command} not allowed while {}", self.state))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::connection::Security;
    use tokio::io::duplex;
    use tokio_test::io::{Builder, Mock};

    fn config() -> Config {
        Config::builder("imap.test").security(Security::None).build()
    }

    async fn selected(mock: Mock) -> Session<Mock> {
        let mut session = Session::from_stream(mock, &config()).await.unwrap();
        session
            .login(&Credentials::new("user@x.com", "pw"))
            .await
            .unwrap();
        session.select("INBOX").await.unwrap();
        session
    }

    fn selected_script() -> Builder {
        let mut builder = Builder::new();
        builder
            .read(b"* OK IMAP4rev1 ready\r\n")
            .write(b"A1 LOGIN \"user@x.com\" \"pw\"\r\n")
            .read(b"A1 OK LOGIN completed\r\n")
            .write(b"A2 SELECT \"INBOX\"\r\n")
            .read(b"* 3 EXISTS\r\nA2 OK [READ-WRITE] SELECT completed\r\n");
        builder
    }

    #[tokio::test]
    async fn test_greeting_ok() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let session = Session::from_stream(mock, &config()).await.unwrap();
        assert_eq!(session.state(), &SessionState::Connected);
    }

    #[tokio::test]
    async fn test_greeting_preauth_skips_login() {
        let mock = Builder::new()
            .read(b"* PREAUTH already in\r\n")
            .write(b"A1 SELECT \"INBOX\"\r\n")
            .read(b"A1 OK done\r\n")
            .build();
        let mut session = Session::from_stream(mock, &config()).await.unwrap();
        assert_eq!(session.state(), &SessionState::Authenticated);

        session
            .login(&Credentials::new("user", "pw"))
            .await
            .unwrap();
        session.select("INBOX").await.unwrap();
        assert!(session.state().is_selected());
    }

    #[tokio::test]
    async fn test_greeting_bye_is_connection_error() {
        let mock = Builder::new().read(b"* BYE too many connections\r\n").build();
        let result = Session::from_stream(mock, &config()).await;
        assert!(matches!(result, Err(Error::Connection(msg)) if msg.contains("too many")));
    }

    #[tokio::test]
    async fn test_greeting_garbage_is_connection_error() {
        let mock = Builder::new().read(b"SSH-2.0-OpenSSH\r\n").build();
        let result = Session::from_stream(mock, &config()).await;
        assert!(matches!(result, Err(Error::Connection(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_greeting_timeout() {
        let (client, _server) = duplex(64);
        let result = Session::from_stream(client, &config()).await;
        assert!(matches!(result, Err(Error::Connection(msg)) if msg.contains("no greeting")));
    }

    #[tokio::test]
    async fn test_login_rejected_carries_status_line() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 LOGIN \"user\" \"wrong\"\r\n")
            .read(b"A1 NO [AUTHENTICATIONFAILED] Invalid credentials\r\n")
            .build();
        let mut session = Session::from_stream(mock, &config()).await.unwrap();

        let err = session
            .login(&Credentials::new("user", "wrong"))
            .await
            .unwrap_err();
        match err {
            Error::Auth(line) => {
                assert_eq!(line, "A1 NO [AUTHENTICATIONFAILED] Invalid credentials");
            }
            other => panic!("expected Auth error, got {other:?}"),
        }
        assert_eq!(session.state(), &SessionState::Connected);
    }

    #[tokio::test]
    async fn test_select_before_login_is_rejected() {
        let mock = Builder::new().read(b"* OK ready\r\n").build();
        let mut session = Session::from_stream(mock, &config()).await.unwrap();

        let err = session.select("INBOX").await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_fetch_before_select_is_rejected() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 LOGIN \"user\" \"pw\"\r\n")
            .read(b"A1 OK\r\n")
            .build();
        let mut session = Session::from_stream(mock, &config()).await.unwrap();
        session.login(&Credentials::new("user", "pw")).await.unwrap();

        let err = session.fetch_body(SeqNum(1)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_select_failure_is_mailbox_error() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 LOGIN \"user\" \"pw\"\r\n")
            .read(b"A1 OK\r\n")
            .write(b"A2 SELECT \"Nope\"\r\n")
            .read(b"A2 NO Mailbox doesn't exist\r\n")
            .build();
        let mut session = Session::from_stream(mock, &config()).await.unwrap();
        session.login(&Credentials::new("user", "pw")).await.unwrap();

        let err = session.select("Nope").await.unwrap_err();
        assert!(matches!(err, Error::Mailbox(line) if line == "A2 NO Mailbox doesn't exist"));
        assert_eq!(session.state(), &SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_search_header() {
        let mock = selected_script()
            .write(b"A3 SEARCH HEADER Message-ID \"<id@x>\"\r\n")
            .read(b"* SEARCH 7 9\r\nA3 OK SEARCH completed\r\n")
            .build();
        let mut session = selected(mock).await;

        let hits = session.search_header("Message-ID", "<id@x>").await.unwrap();
        assert_eq!(hits, vec![SeqNum(7), SeqNum(9)]);
    }

    #[tokio::test]
    async fn test_search_rejected_is_empty() {
        let mock = selected_script()
            .write(b"A3 SEARCH HEADER Message-ID \"x\"\r\n")
            .read(b"A3 BAD unsupported search key\r\n")
            .build();
        let mut session = selected(mock).await;

        let hits = session.search_header("Message-ID", "x").await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_body_exact_literal() {
        let mock = selected_script()
            .write(b"A3 FETCH 438 (BODY.PEEK[])\r\n")
            .read(b"* 438 FETCH (BODY[] {17}\r\n")
            .read(b"Subject: x\r\n\r\nabc")
            .read(b")\r\nA3 OK FETCH completed\r\n")
            .build();
        let mut session = selected(mock).await;

        let raw = session.fetch_body(SeqNum(438)).await.unwrap();
        assert_eq!(&raw[..], b"Subject: x\r\n\r\nabc");
        assert!(session.reader.buffered().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_literal_containing_tag_text() {
        let body = b"A3 OK fake\r\n";
        let mut response = format!("* 1 FETCH (BODY[] {{{}}}\r\n", body.len()).into_bytes();
        response.extend_from_slice(body);
        response.extend_from_slice(b")\r\nA3 OK FETCH completed\r\n");

        let mock = selected_script()
            .write(b"A3 FETCH 1 (BODY.PEEK[])\r\n")
            .read(&response)
            .build();
        let mut session = selected(mock).await;

        let raw = session.fetch_body(SeqNum(1)).await.unwrap();
        assert_eq!(&raw[..], body);
    }

    #[tokio::test]
    async fn test_fetch_without_literal_is_literal_error() {
        let mock = selected_script()
            .write(b"A3 FETCH 99 (BODY.PEEK[])\r\n")
            .read(b"A3 NO no such message\r\n")
            .build();
        let mut session = selected(mock).await;

        let err = session.fetch_body(SeqNum(99)).await.unwrap_err();
        assert!(matches!(err, Error::Literal(msg) if msg.contains("no such message")));
    }

    #[tokio::test]
    async fn test_fetch_oversized_literal_rejected() {
        let mock = Builder::new()
            .read(b"* PREAUTH\r\n")
            .write(b"A1 SELECT \"INBOX\"\r\n")
            .read(b"A1 OK\r\n")
            .write(b"A2 FETCH 1 (BODY.PEEK[])\r\n")
            .read(b"* 1 FETCH (BODY[] {4096}\r\n")
            .build();
        let config = Config::builder("imap.test")
            .security(Security::None)
            .max_literal_size(1024)
            .build();
        let mut session = Session::from_stream(mock, &config).await.unwrap();
        session.select("INBOX").await.unwrap();

        let err = session.fetch_body(SeqNum(1)).await.unwrap_err();
        assert!(matches!(err, Error::Literal(msg) if msg.contains("exceeds")));
    }

    #[tokio::test]
    async fn test_fetch_truncated_literal() {
        let mock = selected_script()
            .write(b"A3 FETCH 5 (BODY.PEEK[])\r\n")
            .read(b"* 5 FETCH (BODY[] {100}\r\nshort")
            .build();
        let mut session = selected(mock).await;

        let err = session.fetch_body(SeqNum(5)).await.unwrap_err();
        assert!(matches!(err, Error::Literal(msg) if msg.contains("truncated")));
    }

    #[tokio::test]
    async fn test_command_interrupted_by_bye() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 LOGIN \"user\" \"pw\"\r\n")
            .read(b"* BYE shutting down\r\n")
            .build();
        let mut session = Session::from_stream(mock, &config()).await.unwrap();

        let err = session
            .login(&Credentials::new("user", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Bye(line) if line == "* BYE shutting down"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_timeout() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (client, mut server) = duplex(1024);
        server.write_all(b"* OK ready\r\n").await.unwrap();

        let mut session = Session::from_stream(client, &config()).await.unwrap();
        let login = tokio::spawn(async move {
            let result = session.login(&Credentials::new("user", "pw")).await;
            (session, result)
        });

        let mut sent = vec![0u8; 64];
        let n = server.read(&mut sent).await.unwrap();
        assert!(sent[..n].starts_with(b"A1 LOGIN"));

        let (_session, result) = login.await.unwrap();
        assert!(matches!(result, Err(Error::Timeout(d)) if d == Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 LOGOUT\r\n")
            .read(b"* BYE logging out\r\nA1 OK LOGOUT completed\r\n")
            .build();
        let mut session = Session::from_stream(mock, &config()).await.unwrap();

        session.logout().await;
        assert_eq!(session.state(), &SessionState::Closed);
        session.logout().await;
        assert_eq!(session.state(), &SessionState::Closed);
    }

    #[tokio::test]
    async fn test_logout_tolerates_silent_server() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A1 LOGOUT\r\n")
            .build();
        let mut session = Session::from_stream(mock, &config()).await.unwrap();

        session.logout().await;
        assert_eq!(session.state(), &SessionState::Closed);
    }
}
