use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::UploadError;
use crate::objects::{ObjectStore, UploadEvent, UploadEvents};

/// Progress granularity for the event-stream upload shape.
const PROGRESS_CHUNK: usize = 64 * 1024;

struct Inner {
    objects: HashMap<String, Bytes>,
    /// Random token per path, minted on first URL resolution.
    tokens: HashMap<String, String>,
    fail_next_upload: bool,
}

/// In-memory binary object store.
pub struct MemoryObjects {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryObjects {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                objects: HashMap::new(),
                tokens: HashMap::new(),
                fail_next_upload: false,
            })),
        }
    }

    /// Make the next upload (either call shape) fail mid-transfer.
    pub fn fail_next_upload(&self) {
        self.inner.lock().expect("lock poisoned").fail_next_upload = true;
    }

    /// Raw stored bytes, for assertions.
    pub fn object(&self, path: &str) -> Option<Bytes> {
        self.inner.lock().expect("lock poisoned").objects.get(path).cloned()
    }
}

impl Default for MemoryObjects {
    fn default() -> Self {
        Self::new()
    }
}

fn store_object(inner: &Arc<Mutex<Inner>>, path: &str, data: Bytes) -> Result<(), UploadError> {
    let mut guard = inner.lock().expect("lock poisoned");
    if guard.fail_next_upload {
        guard.fail_next_upload = false;
        return Err(UploadError::Transfer("injected transfer failure".to_string()));
    }
    guard.objects.insert(path.to_string(), data);
    Ok(())
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    async fn upload(&self, path: &str, data: Bytes) -> Result<(), UploadError> {
        let len = data.len();
        store_object(&self.inner, path, data)?;
        debug!(path, size = len, "object stored");
        Ok(())
    }

    fn upload_with_events(&self, path: &str, data: Bytes) -> UploadEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        let inner = Arc::clone(&self.inner);
        let path = path.to_string();

        tokio::spawn(async move {
            let total = data.len();
            let mut transferred = 0;
            while transferred < total {
                transferred = (transferred + PROGRESS_CHUNK).min(total);
                let _ = tx.send(UploadEvent::Progress { transferred, total });
                // Yield so observers see progress before the terminal event.
                tokio::task::yield_now().await;
            }

            let terminal = match store_object(&inner, &path, data) {
                Ok(()) => UploadEvent::Completed,
                Err(UploadError::Transfer(msg)) => UploadEvent::Failed(msg),
                Err(other) => UploadEvent::Failed(other.to_string()),
            };
            let _ = tx.send(terminal);
        });

        UploadEvents::new(rx)
    }

    async fn download_url(&self, path: &str) -> Result<String, UploadError> {
        let mut guard = self.inner.lock().expect("lock poisoned");
        if !guard.objects.contains_key(path) {
            return Err(UploadError::NotFound(path.to_string()));
        }
        let token = guard
            .tokens
            .entry(path.to_string())
            .or_insert_with(|| {
                let mut raw = [0u8; 8];
                OsRng.fill_bytes(&mut raw);
                hex::encode(raw)
            })
            .clone();
        Ok(format!("memory://objects/{path}?token={token}"))
    }
}
