//! The fetch-email-body operation.
//!
//! Bridges the HTTP surface with the IMAP fetcher, the MIME extractor and
//! the body store.

mod fetch_body;
mod validation;

pub use fetch_body::{
    FetchBodyRequest, FetchBodyResponse, ResponseStatus, handle_fetch_body,
    handle_fetch_body_json,
};
pub use validation::{ValidationError, validate_request};
