//! Feed entities and the validation applied at the document-store boundary.
//!
//! Documents travel as untyped JSON field maps. Everything entering the
//! engine is decoded through [`FeedRecord::from_fields`], which rejects
//! documents missing required fields instead of letting empty values leak
//! into materialized lists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DecodeError;
use crate::identity::Identity;
use crate::types::{DocumentId, Fields, ServerTime};

/// Collection path of the main feed.
pub const POSTS_PATH: &str = "posts";

/// Collection path of a post's comment sub-collection.
pub fn comments_path(post_id: &DocumentId) -> String {
    format!("{}/{}/comments", POSTS_PATH, post_id)
}

// Wire field names, matching the persisted document layout.
const F_USERNAME: &str = "username";
const F_AVATAR: &str = "avatar";
const F_TEXT: &str = "text";
const F_IMAGE: &str = "image";
const F_TIMESTAMP: &str = "timestamp";

/// A record type that can be materialized from a live collection.
pub trait FeedRecord: Sized {
    /// Decode a raw document, rejecting it if required fields are missing.
    /// The collection path is available for records whose scope is encoded
    /// in the path (comments carry their parent post id there).
    fn from_fields(
        collection_path: &str,
        id: DocumentId,
        fields: &Fields,
    ) -> Result<Self, DecodeError>;

    fn id(&self) -> &DocumentId;

    /// Ordering key. The store's clock is the sole ordering authority.
    fn created_at(&self) -> ServerTime;
}

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

/// A published feed post. Created once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: DocumentId,
    pub author_name: String,
    pub author_avatar: String,
    pub text: String,
    /// Resolved download URL of the attached image, empty if none.
    pub image_url: String,
    pub created_at: ServerTime,
}

impl Post {
    /// Field map appended to the store when publishing a post.
    ///
    /// The timestamp is written as a null placeholder; the store resolves
    /// it with its own clock at append time. The client clock never
    /// participates in ordering.
    pub fn fields(author: &Identity, text: &str, image_url: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert(F_USERNAME.into(), Value::String(author.display_name.clone()));
        fields.insert(F_AVATAR.into(), Value::String(author.photo_url.clone()));
        fields.insert(F_TEXT.into(), Value::String(text.to_string()));
        fields.insert(F_IMAGE.into(), Value::String(image_url.to_string()));
        fields.insert(F_TIMESTAMP.into(), Value::Null);
        fields
    }
}

impl FeedRecord for Post {
    fn from_fields(
        _collection_path: &str,
        id: DocumentId,
        fields: &Fields,
    ) -> Result<Self, DecodeError> {
        Ok(Self {
            author_name: required_str(&id, fields, F_USERNAME)?,
            author_avatar: required_str(&id, fields, F_AVATAR)?,
            text: required_str(&id, fields, F_TEXT)?,
            image_url: required_str(&id, fields, F_IMAGE)?,
            created_at: timestamp(&id, fields)?,
            id,
        })
    }

    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn created_at(&self) -> ServerTime {
        self.created_at
    }
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

/// A comment attached to a post. Scoped strictly under its parent's
/// comment sub-collection; the parent id is not persisted in the fields
/// but recovered from the sub-collection path at decode time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: DocumentId,
    pub parent_post_id: DocumentId,
    pub author_name: String,
    pub author_avatar: String,
    pub text: String,
    pub created_at: ServerTime,
}

impl Comment {
    /// Field map appended when commenting. Timestamp placeholder as for
    /// [`Post::fields`].
    pub fn fields(author: &Identity, text: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert(F_USERNAME.into(), Value::String(author.display_name.clone()));
        fields.insert(F_AVATAR.into(), Value::String(author.photo_url.clone()));
        fields.insert(F_TEXT.into(), Value::String(text.to_string()));
        fields.insert(F_TIMESTAMP.into(), Value::Null);
        fields
    }
}

impl FeedRecord for Comment {
    fn from_fields(
        collection_path: &str,
        id: DocumentId,
        fields: &Fields,
    ) -> Result<Self, DecodeError> {
        Ok(Self {
            parent_post_id: parent_from_path(collection_path),
            author_name: required_str(&id, fields, F_USERNAME)?,
            author_avatar: required_str(&id, fields, F_AVATAR)?,
            text: required_str(&id, fields, F_TEXT)?,
            created_at: timestamp(&id, fields)?,
            id,
        })
    }

    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn created_at(&self) -> ServerTime {
        self.created_at
    }
}

/// Recover the parent post id from a `posts/{id}/comments` path. An empty
/// id results for malformed paths and is caught by callers that require a
/// parent.
fn parent_from_path(collection_path: &str) -> DocumentId {
    let mut segments = collection_path.split('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(POSTS_PATH), Some(id), Some("comments")) => DocumentId(id.to_string()),
        _ => DocumentId(String::new()),
    }
}

// ---------------------------------------------------------------------------
// Field decoding helpers
// ---------------------------------------------------------------------------

fn required_str(id: &DocumentId, fields: &Fields, field: &'static str) -> Result<String, DecodeError> {
    match fields.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(DecodeError::WrongType {
            document_id: id.0.clone(),
            field,
        }),
        None => Err(DecodeError::MissingField {
            document_id: id.0.clone(),
            field,
        }),
    }
}

fn timestamp(id: &DocumentId, fields: &Fields) -> Result<ServerTime, DecodeError> {
    match fields.get(F_TIMESTAMP) {
        // Placeholder still unresolved by the store.
        None | Some(Value::Null) => Ok(ServerTime::Pending),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|t| ServerTime::Resolved(t.with_timezone(&Utc)))
            .map_err(|_| DecodeError::BadTimestamp {
                document_id: id.0.clone(),
                value: s.clone(),
            }),
        Some(_) => Err(DecodeError::WrongType {
            document_id: id.0.clone(),
            field: F_TIMESTAMP,
        }),
    }
}
