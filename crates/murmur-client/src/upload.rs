//! Upload pipeline.
//!
//! Storage keys get a random 16-character alphanumeric prefix drawn from
//! the OS CSPRNG, both to avoid collisions and to keep untrusted filenames
//! from steering the storage path. Two call shapes are offered to match
//! the two paths in the app: awaitable (avatar) and observable (post
//! image).

use std::sync::Arc;

use bytes::Bytes;
use rand::rngs::OsRng;
use rand::Rng;
use tracing::{debug, info};

use murmur_store::{ObjectStore, UploadEvents};

use crate::error::Result;

/// Object-store directory for post images.
pub const IMAGES_DIR: &str = "images";

/// Object-store directory for account avatars.
pub const AVATARS_DIR: &str = "avatars";

const KEY_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const KEY_PREFIX_LEN: usize = 16;

/// Collision-resistant storage key: `<16 random alphanumerics>_<name>`.
/// Sampling is uniform over the 62-character alphabet.
pub fn storage_key(file_name: &str) -> String {
    let mut rng = OsRng;
    let prefix: String = (0..KEY_PREFIX_LEN)
        .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
        .collect();
    format!("{}_{}", prefix, sanitize_file_name(file_name))
}

/// Keep only the final path component of an untrusted filename and strip
/// traversal sequences.
fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .replace("..", "");
    if base.is_empty() {
        "file".to_string()
    } else {
        base
    }
}

/// Uploads blobs and resolves their durable retrieval URLs.
#[derive(Clone)]
pub struct Uploader {
    objects: Arc<dyn ObjectStore>,
}

impl Uploader {
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self { objects }
    }

    /// Awaitable shape: upload to completion, then resolve the URL.
    pub async fn put(&self, dir: &str, file_name: &str, data: Bytes) -> Result<String> {
        let path = format!("{}/{}", dir, storage_key(file_name));
        let size = data.len();
        self.objects.upload(&path, data).await?;
        let url = self.objects.download_url(&path).await?;
        info!(path, size, "upload complete");
        Ok(url)
    }

    /// Observable shape: returns the chosen storage path and the event
    /// stream. The stream carries exactly one terminal event; the URL is
    /// only resolvable after `Completed`.
    pub fn put_with_events(&self, dir: &str, file_name: &str, data: Bytes) -> (String, UploadEvents) {
        let path = format!("{}/{}", dir, storage_key(file_name));
        let events = self.objects.upload_with_events(&path, data);
        (path, events)
    }

    /// Observable shape driven to completion: progress is logged, and the
    /// resolved URL is returned only if the terminal event was `Completed`.
    pub async fn put_observed(&self, dir: &str, file_name: &str, data: Bytes) -> Result<String> {
        let (path, events) = self.put_with_events(dir, file_name, data);
        events
            .wait(|transferred, total| debug!(path = %path, transferred, total, "upload progress"))
            .await?;
        Ok(self.objects.download_url(&path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use murmur_store::{MemoryObjects, UploadError};

    use crate::error::ClientError;

    #[test]
    fn test_storage_key_shape() {
        let key = storage_key("photo.png");
        let (prefix, name) = key.split_once('_').unwrap();
        assert_eq!(prefix.len(), 16);
        assert!(prefix.bytes().all(|b| b.is_ascii_alphanumeric()));
        assert_eq!(name, "photo.png");
    }

    #[test]
    fn test_storage_keys_are_unique() {
        let a = storage_key("photo.png");
        let b = storage_key("photo.png");
        assert_ne!(a, b);
    }

    #[test]
    fn test_untrusted_filenames_are_sanitized() {
        assert!(storage_key("../../etc/passwd").ends_with("_passwd"));
        assert!(storage_key("a/b\\c.png").ends_with("_c.png"));
        assert!(storage_key("..").ends_with("_file"));
    }

    #[tokio::test]
    async fn test_put_resolves_url() {
        let objects = Arc::new(MemoryObjects::new());
        let uploader = Uploader::new(objects);
        let url = uploader
            .put(AVATARS_DIR, "me.png", Bytes::from_static(b"avatar"))
            .await
            .unwrap();
        assert!(url.contains("avatars/"));
        assert!(url.contains("me.png"));
    }

    #[tokio::test]
    async fn test_put_observed_reports_failure() {
        let objects = Arc::new(MemoryObjects::new());
        objects.fail_next_upload();
        let uploader = Uploader::new(objects);

        let err = uploader
            .put_observed(IMAGES_DIR, "pic.png", Bytes::from_static(b"img"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Upload(UploadError::Transfer(_))));
    }
}
