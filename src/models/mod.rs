//! API payload models.
//!
//! Typed shapes for the two remote services: Pivotal Tracker stories,
//! iterations, comments, tasks and attachments, and GitHub issues and
//! OAuth authorizations. Unknown response fields are ignored; optional
//! fields default so the structs tolerate the sparse payloads the list
//! endpoints return.

mod issue;
mod story;

pub use issue::*;
pub use story::*;
