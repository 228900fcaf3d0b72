//! Storage for extracted message bodies.
//!
//! One record per `(email, message_id)`: fetching the same message again
//! overwrites the earlier result.

mod model;
mod repository;

pub use model::StoredBody;
pub use repository::BodyRepository;
