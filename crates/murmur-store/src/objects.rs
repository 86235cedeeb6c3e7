//! Binary object store contract.
//!
//! Two call shapes are supported, matching the two upload paths in the
//! application: an awaitable upload (avatar path) and an observable event
//! stream with progress reporting (post-image path). Every event stream
//! carries exactly one terminal event.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::UploadError;

/// Progress and outcome events for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    Progress { transferred: usize, total: usize },
    /// Terminal: the object is durably stored.
    Completed,
    /// Terminal: the transfer failed; nothing dependent on it may proceed.
    Failed(String),
}

impl UploadEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}

/// Event stream for one in-flight upload.
pub struct UploadEvents {
    rx: mpsc::UnboundedReceiver<UploadEvent>,
}

impl UploadEvents {
    pub fn new(rx: mpsc::UnboundedReceiver<UploadEvent>) -> Self {
        Self { rx }
    }

    pub async fn recv(&mut self) -> Option<UploadEvent> {
        self.rx.recv().await
    }

    /// Drain the stream to its terminal event. Progress items are passed
    /// to `on_progress`. A stream that closes without a terminal event is
    /// reported as [`UploadError::Interrupted`].
    pub async fn wait(mut self, mut on_progress: impl FnMut(usize, usize) + Send) -> Result<(), UploadError> {
        while let Some(event) = self.recv().await {
            match event {
                UploadEvent::Progress { transferred, total } => on_progress(transferred, total),
                UploadEvent::Completed => return Ok(()),
                UploadEvent::Failed(msg) => return Err(UploadError::Transfer(msg)),
            }
        }
        Err(UploadError::Interrupted)
    }
}

/// Contract with the external binary object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload and wait for durability.
    async fn upload(&self, path: &str, data: Bytes) -> Result<(), UploadError>;

    /// Fire-and-observe upload. The returned stream yields zero or more
    /// `Progress` events followed by exactly one terminal event.
    fn upload_with_events(&self, path: &str, data: Bytes) -> UploadEvents;

    /// Resolve a durable retrieval URL for a previously uploaded object.
    async fn download_url(&self, path: &str) -> Result<String, UploadError>;
}
