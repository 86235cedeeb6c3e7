//! Post and comment writer.
//!
//! Append-only: posts and comments are created once and never edited or
//! deleted. When a post carries an image, the upload runs to completion
//! first and the document append happens only on a resolved URL, so a post
//! can never reference an image that was not durably stored.

use std::sync::Arc;

use bytes::Bytes;
use tracing::info;

use murmur_shared::{comments_path, Comment, DocumentId, Post, POSTS_PATH};
use murmur_store::DocumentStore;

use crate::error::{ClientError, Result};
use crate::state::IdentityStore;
use crate::upload::{Uploader, IMAGES_DIR};

/// A user-supplied file: original name plus contents.
#[derive(Debug, Clone)]
pub struct NamedBlob {
    pub file_name: String,
    pub data: Bytes,
}

impl NamedBlob {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }
}

/// Composes identity, text, and upload output into immutable appends.
#[derive(Clone)]
pub struct FeedWriter {
    documents: Arc<dyn DocumentStore>,
    uploader: Uploader,
    identity: IdentityStore,
}

impl FeedWriter {
    pub fn new(documents: Arc<dyn DocumentStore>, uploader: Uploader, identity: IdentityStore) -> Self {
        Self {
            documents,
            uploader,
            identity,
        }
    }

    /// Publish a post. With an image attached the sequence is strict:
    /// upload, resolve URL, then append; any upload failure aborts before
    /// the append. The timestamp is the store's, never ours.
    pub async fn create_post(&self, text: &str, image: Option<NamedBlob>) -> Result<DocumentId> {
        if text.trim().is_empty() {
            return Err(ClientError::InvalidInput("post text must not be empty"));
        }
        let author = self.identity.current();
        if author.is_signed_out() {
            return Err(ClientError::SignedOut);
        }

        let image_url = match image {
            Some(blob) => {
                self.uploader
                    .put_observed(IMAGES_DIR, &blob.file_name, blob.data)
                    .await?
            }
            None => String::new(),
        };

        let id = self
            .documents
            .append(POSTS_PATH, Post::fields(&author, text, &image_url))
            .await?;
        info!(id = %id, author = %author.id, has_image = !image_url.is_empty(), "post published");
        Ok(id)
    }

    /// Append a comment under its parent post's sub-collection.
    pub async fn create_comment(&self, parent_post_id: &DocumentId, text: &str) -> Result<DocumentId> {
        if text.trim().is_empty() {
            return Err(ClientError::InvalidInput("comment text must not be empty"));
        }
        if parent_post_id.is_empty() {
            return Err(ClientError::InvalidInput("comment requires a parent post id"));
        }
        let author = self.identity.current();
        if author.is_signed_out() {
            return Err(ClientError::SignedOut);
        }

        let id = self
            .documents
            .append(&comments_path(parent_post_id), Comment::fields(&author, text))
            .await?;
        info!(id = %id, parent = %parent_post_id, "comment published");
        Ok(id)
    }
}
