//! IMAP command builder.
//!
//! Only the handful of commands needed to pull one message are modelled.

mod serialize;
mod tag_generator;

use crate::types::SeqNum;

pub use tag_generator::TagGenerator;

use serialize::write_quoted;

/// IMAP command.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// LOGIN command.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// SELECT command.
    Select {
        /// Mailbox to select.
        mailbox: String,
    },
    /// `SEARCH HEADER <name> <value>`.
    SearchHeader {
        /// Header field name.
        name: String,
        /// Value to match.
        value: String,
    },
    /// `FETCH <seq> (BODY.PEEK[])`.
    FetchBody {
        /// Sequence number of the message.
        seq: SeqNum,
    },
    /// LOGOUT command.
    Logout,
}

impl Command {
    /// Serializes the command to bytes with the given tag.
    #[must_use]
    pub fn serialize(&self, tag: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');

        match self {
            Self::Login { username, password } => {
                buf.extend_from_slice(b"LOGIN ");
                write_quoted(&mut buf, username);
                buf.push(b' ');
                write_quoted(&mut buf, password);
            }
            Self::Select { mailbox } => {
                buf.extend_from_slice(b"SELECT ");
                write_quoted(&mut buf, mailbox);
            }
            Self::SearchHeader { name, value } => {
                buf.extend_from_slice(b"SEARCH HEADER ");
                buf.extend_from_slice(name.as_bytes());
                buf.push(b' ');
                write_quoted(&mut buf, value);
            }
            Self::FetchBody { seq } => {
                buf.extend_from_slice(format!("FETCH {seq} (BODY.PEEK[])").as_bytes());
            }
            Self::Logout => buf.extend_from_slice(b"LOGOUT"),
        }

        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Command name for log output.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "LOGIN",
            Self::Select { .. } => "SELECT",
            Self::SearchHeader { .. } => "SEARCH",
            Self::FetchBody { .. } => "FETCH",
            Self::Logout => "LOGOUT",
        }
    }
}

// Manual Debug implementation so the password never reaches a log line
impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Select { mailbox } => f.debug_struct("Select").field("mailbox", mailbox).finish(),
            Self::SearchHeader { name, value } => f
                .debug_struct("SearchHeader")
                .field("name", name)
                .field("value", value)
                .finish(),
            Self::FetchBody { seq } => f.debug_struct("FetchBody").field("seq", seq).finish(),
            Self::Logout => f.write_str("Logout"),
        }
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

    #[test]
    fn test_login_serialization() {
        let cmd = Command::Login {
            username: "user@example.com".to_string(),
            password: r#"se"cr\et"#.to_string(),
        };
        assert_eq!(
            cmd.serialize("A1"),
            b"A1 LOGIN \"user@example.com\" \"se\\\"cr\\\\et\"\r\n"
        );
    }

    #[test]
    fn test_select_serialization() {
        let cmd = Command::Select {
            mailbox: "Sent Items".to_string(),
        };
        assert_eq!(cmd.serialize("A2"), b"A2 SELECT \"Sent Items\"\r\n");
    }

    #[test]
    fn test_search_header_serialization() {
        let cmd = Command::SearchHeader {
            name: "Message-ID".to_string(),
            value: "<abc@example.com>".to_string(),
        };
        assert_eq!(
            cmd.serialize("A3"),
            b"A3 SEARCH HEADER Message-ID \"<abc@example.com>\"\r\n"
        );
    }

    #[test]
    fn test_fetch_body_serialization() {
        let cmd = Command::FetchBody { seq: SeqNum(438) };
        assert_eq!(cmd.serialize("A4"), b"A4 FETCH 438 (BODY.PEEK[])\r\n");
    }

    #[test]
    fn test_logout_serialization() {
        assert_eq!(Command::Logout.serialize("A5"), b"A5 LOGOUT\r\n");
    }

    #[test]
    fn test_debug_redacts_password() {
        let cmd = Command::Login {
            username: "user".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{cmd:?}");
        assert!(debug.contains("user"));
        assert!(!debug.contains("hunter2"));
    }
}
