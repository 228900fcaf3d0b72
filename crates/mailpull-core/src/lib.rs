//! # mailpull-core
//!
//! The fetch-email-body operation for `mailpull`.
//!
//! This crate provides:
//! - Request/response contract and status taxonomy
//! - Orchestration of IMAP fetch, MIME extraction and storage
//! - Fetch tuning settings
//! - Local body storage (`SQLite`)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod service;
pub mod settings;
pub mod store;

pub use error::{Error, Result};
pub use service::{
    FetchBodyRequest, FetchBodyResponse, ResponseStatus, ValidationError, handle_fetch_body,
    handle_fetch_body_json, validate_request,
};
pub use settings::FetchSettings;
pub use store::{BodyRepository, StoredBody};
