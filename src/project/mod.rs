//! Project documents and their on-disk store.
//!
//! A project bundles the cloud project id, query settings and the saved query
//! sessions of one window. It is persisted as a flat JSON file.

mod document;
mod store;

pub use document::{ProjectDocument, Session, SESSION_NAME_MAX_CHARS};
pub use store::{ensure_extension, load, save};

/// File extension used for saved projects.
pub const PROJECT_FILE_EXTENSION: &str = "giant";
