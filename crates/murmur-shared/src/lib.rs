//! # murmur-shared
//!
//! Domain types shared between the murmur sync engine and its backends:
//! the authenticated identity, the feed entities (posts and comments),
//! typed document identifiers, and the validation that guards the
//! document-store boundary.

pub mod error;
pub mod identity;
pub mod models;
pub mod types;

pub use error::DecodeError;
pub use identity::Identity;
pub use models::{comments_path, Comment, FeedRecord, Post, POSTS_PATH};
pub use types::{DocumentId, Fields, ServerTime};
