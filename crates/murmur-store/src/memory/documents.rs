use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use murmur_shared::{DocumentId, Fields};

use crate::documents::{ChangeBatch, ChangeBatches, ChangeKind, DocChange, DocumentStore};
use crate::error::StoreError;

struct Inner {
    /// Documents per collection path, in commit order.
    collections: HashMap<String, Vec<(DocumentId, Fields)>>,
    /// Live query fan-out. Closed senders are pruned lazily.
    watchers: HashMap<String, Vec<mpsc::UnboundedSender<ChangeBatch>>>,
    /// Last timestamp handed out by the server clock.
    last_ts: DateTime<Utc>,
    appends: u64,
    fail_next_append: bool,
}

/// In-memory document store with live queries and a server-side clock.
pub struct MemoryDocuments {
    inner: Mutex<Inner>,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                collections: HashMap::new(),
                watchers: HashMap::new(),
                last_ts: DateTime::<Utc>::MIN_UTC,
                appends: 0,
                fail_next_append: false,
            }),
        }
    }

    /// Make the next append fail with a permission error.
    pub fn fail_next_append(&self) {
        self.inner.lock().expect("lock poisoned").fail_next_append = true;
    }

    /// Total appends accepted so far.
    pub fn append_count(&self) -> u64 {
        self.inner.lock().expect("lock poisoned").appends
    }

    /// Close every live query on a path, simulating store-side stream
    /// termination.
    pub fn terminate_streams(&self, collection_path: &str) {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.watchers.remove(collection_path);
    }

    /// Append with a caller-chosen timestamp. Test hook for arrival-order
    /// scenarios; the clock still moves forward so later appends stay
    /// monotonic relative to it.
    pub fn append_at(
        &self,
        collection_path: &str,
        mut fields: Fields,
        timestamp: DateTime<Utc>,
    ) -> Result<DocumentId, StoreError> {
        fields.insert("timestamp".to_string(), Value::String(timestamp.to_rfc3339()));
        let mut inner = self.inner.lock().expect("lock poisoned");
        if timestamp > inner.last_ts {
            inner.last_ts = timestamp;
        }
        Ok(commit(&mut inner, collection_path, fields))
    }
}

impl Default for MemoryDocuments {
    fn default() -> Self {
        Self::new()
    }
}

/// Insert the document and fan the change out to live queries, all under
/// the lock so batches reach every subscriber in commit order.
fn commit(inner: &mut Inner, collection_path: &str, fields: Fields) -> DocumentId {
    let id = DocumentId(Uuid::new_v4().to_string());
    inner
        .collections
        .entry(collection_path.to_string())
        .or_default()
        .push((id.clone(), fields.clone()));
    inner.appends += 1;

    let batch = ChangeBatch {
        changes: vec![DocChange {
            kind: ChangeKind::Added,
            id: id.clone(),
            fields,
        }],
    };

    if let Some(watchers) = inner.watchers.get_mut(collection_path) {
        watchers.retain(|tx| tx.send(batch.clone()).is_ok());
    }

    debug!(path = collection_path, id = %id, "document appended");
    id
}

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn append(&self, collection_path: &str, mut fields: Fields) -> Result<DocumentId, StoreError> {
        if collection_path.is_empty() {
            return Err(StoreError::InvalidPath("empty path".to_string()));
        }

        let mut inner = self.inner.lock().expect("lock poisoned");

        if inner.fail_next_append {
            inner.fail_next_append = false;
            return Err(StoreError::PermissionDenied(collection_path.to_string()));
        }

        // Resolve the server-timestamp placeholder. The clock is strictly
        // monotonic even when appends land within the same millisecond.
        let mut now = Utc::now();
        if now <= inner.last_ts {
            now = inner.last_ts + Duration::milliseconds(1);
        }
        inner.last_ts = now;
        match fields.get("timestamp") {
            None | Some(Value::Null) => {
                fields.insert("timestamp".to_string(), Value::String(now.to_rfc3339()));
            }
            Some(_) => {} // already resolved by a test hook
        }

        Ok(commit(&mut inner, collection_path, fields))
    }

    async fn subscribe(&self, collection_path: &str) -> Result<ChangeBatches, StoreError> {
        if collection_path.is_empty() {
            return Err(StoreError::InvalidPath("empty path".to_string()));
        }

        let mut inner = self.inner.lock().expect("lock poisoned");

        // First batch replays current contents; empty collection yields an
        // empty batch rather than an error.
        let changes = inner
            .collections
            .get(collection_path)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| DocChange {
                        kind: ChangeKind::Added,
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(ChangeBatch { changes });
        inner
            .watchers
            .entry(collection_path.to_string())
            .or_default()
            .push(tx);

        Ok(ChangeBatches::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(text: &str) -> Fields {
        let mut f = Fields::new();
        f.insert("text".to_string(), Value::String(text.to_string()));
        f.insert("timestamp".to_string(), Value::Null);
        f
    }

    #[tokio::test]
    async fn test_append_resolves_timestamp() {
        let store = MemoryDocuments::new();
        store.append("posts", fields("hi")).await.unwrap();

        let mut stream = store.subscribe("posts").await.unwrap();
        let batch = stream.recv().await.unwrap();
        assert_eq!(batch.changes.len(), 1);
        let ts = batch.changes[0].fields.get("timestamp").unwrap();
        assert!(ts.is_string());
    }

    #[tokio::test]
    async fn test_timestamps_strictly_monotonic() {
        let store = MemoryDocuments::new();
        for i in 0..50 {
            store.append("posts", fields(&format!("p{i}"))).await.unwrap();
        }

        let mut stream = store.subscribe("posts").await.unwrap();
        let batch = stream.recv().await.unwrap();
        let stamps: Vec<String> = batch
            .changes
            .iter()
            .map(|c| c.fields["timestamp"].as_str().unwrap().to_string())
            .collect();
        for pair in stamps.windows(2) {
            let a = DateTime::parse_from_rfc3339(&pair[0]).unwrap();
            let b = DateTime::parse_from_rfc3339(&pair[1]).unwrap();
            assert!(a < b, "clock went backwards: {} >= {}", pair[0], pair[1]);
        }
    }

    #[tokio::test]
    async fn test_empty_collection_yields_empty_batch() {
        let store = MemoryDocuments::new();
        let mut stream = store.subscribe("posts").await.unwrap();
        let batch = stream.recv().await.unwrap();
        assert!(batch.changes.is_empty());
    }

    #[tokio::test]
    async fn test_live_delivery_to_subscriber() {
        let store = MemoryDocuments::new();
        let mut stream = store.subscribe("posts").await.unwrap();
        stream.recv().await.unwrap(); // initial empty batch

        store.append("posts", fields("fresh")).await.unwrap();
        let batch = stream.recv().await.unwrap();
        assert_eq!(batch.changes[0].fields["text"], "fresh");
        assert_eq!(batch.changes[0].kind, ChangeKind::Added);
    }

    #[tokio::test]
    async fn test_paths_are_isolated() {
        let store = MemoryDocuments::new();
        let mut a = store.subscribe("posts/p1/comments").await.unwrap();
        a.recv().await.unwrap();

        store.append("posts/p2/comments", fields("other")).await.unwrap();
        store.append("posts/p1/comments", fields("mine")).await.unwrap();

        let batch = a.recv().await.unwrap();
        assert_eq!(batch.changes[0].fields["text"], "mine");
    }

    #[tokio::test]
    async fn test_injected_append_failure() {
        let store = MemoryDocuments::new();
        store.fail_next_append();
        let err = store.append("posts", fields("nope")).await.unwrap_err();
        assert!(matches!(err, StoreError::PermissionDenied(_)));
        assert_eq!(store.append_count(), 0);

        // Failure is one-shot.
        store.append("posts", fields("ok")).await.unwrap();
        assert_eq!(store.append_count(), 1);
    }

    #[tokio::test]
    async fn test_terminate_streams_closes_subscribers() {
        let store = MemoryDocuments::new();
        let mut stream = store.subscribe("posts").await.unwrap();
        stream.recv().await.unwrap();

        store.terminate_streams("posts");
        assert!(stream.recv().await.is_none());
    }
}
