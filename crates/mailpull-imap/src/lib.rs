//! # mailpull-imap
//!
//! A small IMAP4rev1 client that does one job: download the complete raw
//! message a stored locator points at.
//!
//! ## Features
//!
//! - **Locator resolution**: sequence numbers embedded in legacy identifiers,
//!   or a `SEARCH HEADER Message-ID` lookup
//! - **Byte-exact literals**: the `BODY[] {N}` length is authoritative, no
//!   matter how the server chunks its output
//! - **Bounded waits**: greeting, every command and the FETCH tail each have
//!   their own deadline
//! - **TLS via rustls**: secure connections without OpenSSL dependency
//! - **Sans-I/O scanners**: response recognition separated from network I/O
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailpull_imap::{Config, Credentials, FetchOutcome, Security};
//!
//! #[tokio::main]
//! async fn main() -> mailpull_imap::Result<()> {
//!     let config = Config::builder("imap.example.com")
//!         .security(Security::Implicit)
//!         .build();
//!     let credentials = Credentials::new("user@example.com", "password");
//!
//!     match mailpull_imap::fetch_raw_message(
//!         &config,
//!         &credentials,
//!         "INBOX",
//!         "user@example.com-438-1699999999",
//!     )
//!     .await?
//!     {
//!         FetchOutcome::Found { seq, raw } => println!("{seq}: {} bytes", raw.len()),
//!         FetchOutcome::NotFound => println!("gone"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`command`]: command builders and tag generation
//! - [`connection`]: transport, bounded reader and session state machine
//! - [`locator`]: classification of stored message locators
//! - [`response`]: scanners for greetings, completions and literals
//! - [`types`]: sequence numbers, statuses and credentials

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
mod fetch;
pub mod locator;
pub mod response;
pub mod types;

pub use command::{Command, TagGenerator};
pub use connection::{Config, ConfigBuilder, ImapStream, Security, Session, SessionState};
pub use error::{Error, Result};
pub use fetch::{FetchOutcome, fetch_raw_message, fetch_with_session};
pub use locator::Locator;
pub use types::{Credentials, SeqNum, Status};
