//! Live collection subscriber.
//!
//! Folds a live query's change batches into a fully materialized, ordered
//! list and publishes complete snapshots through a watch channel. Each
//! batch is folded and re-sorted atomically, so observers never see a
//! transiently mis-ordered list.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use murmur_shared::{DocumentId, FeedRecord};
use murmur_store::{ChangeBatch, ChangeKind, DocumentStore};

use crate::error::{ClientError, Result};

/// Snapshot ordering, keyed on the server timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recent first (feeds and comment threads).
    NewestFirst,
    OldestFirst,
}

/// One live, materialized collection.
///
/// At most one underlying store subscription exists per `LiveList`.
/// [`cancel`](Self::cancel) is idempotent and joins the fold task, so no
/// in-flight batch can touch the snapshot after it returns. Dropping the
/// handle requests cancellation without waiting.
pub struct LiveList<T> {
    snapshots: watch::Receiver<Vec<T>>,
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    ended: Arc<AtomicBool>,
    path: String,
}

impl<T> LiveList<T>
where
    T: FeedRecord + Clone + Send + Sync + 'static,
{
    /// Open a live query and start materializing it. The first snapshot
    /// reflects the collection's current contents; an empty collection
    /// materializes as an empty list, not an error.
    pub async fn open(
        store: Arc<dyn DocumentStore>,
        collection_path: &str,
        order: SortOrder,
    ) -> Result<Self> {
        let mut batches = store.subscribe(collection_path).await?;

        let (snap_tx, snap_rx) = watch::channel(Vec::new());
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        let ended = Arc::new(AtomicBool::new(false));

        let path = collection_path.to_string();
        let task_path = path.clone();
        let task_ended = Arc::clone(&ended);

        let task = tokio::spawn(async move {
            let mut docs: HashMap<DocumentId, T> = HashMap::new();
            loop {
                tokio::select! {
                    _ = &mut cancel_rx => {
                        debug!(path = %task_path, "live list cancelled");
                        break;
                    }
                    batch = batches.recv() => match batch {
                        Some(batch) => {
                            fold(&mut docs, &batch, &task_path);
                            if snap_tx.send(materialize(&docs, order)).is_err() {
                                // Every view of this list is gone.
                                break;
                            }
                        }
                        None => {
                            // Store-side termination: flag it rather than
                            // presenting the stale list as current.
                            task_ended.store(true, Ordering::Release);
                            warn!(path = %task_path, "live query terminated by store");
                            break;
                        }
                    }
                }
            }
        });

        Ok(Self {
            snapshots: snap_rx,
            cancel: Some(cancel_tx),
            task: Some(task),
            ended,
            path,
        })
    }

    /// The current materialized snapshot.
    pub fn snapshot(&self) -> Vec<T> {
        self.snapshots.borrow().clone()
    }

    /// Wait for the next snapshot after the last one this handle observed.
    /// Errors with [`ClientError::SubscriptionEnded`] once no further
    /// snapshot can arrive.
    pub async fn changed(&mut self) -> Result<Vec<T>> {
        self.snapshots
            .changed()
            .await
            .map_err(|_| ClientError::SubscriptionEnded)?;
        Ok(self.snapshots.borrow_and_update().clone())
    }

    /// Whether the store terminated this query's stream. The snapshot is
    /// then stale and must not be presented as live.
    pub fn ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    /// Collection path this list is bound to.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Cancel the subscription. Idempotent; joins the fold task so no
    /// in-flight notification mutates the snapshot after this returns.
    pub async fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl<T> Drop for LiveList<T> {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}

/// Apply one change batch to the document set. Undecodable documents are
/// quarantined: logged and skipped, never materialized half-empty.
fn fold<T: FeedRecord>(docs: &mut HashMap<DocumentId, T>, batch: &ChangeBatch, path: &str) {
    for change in &batch.changes {
        match change.kind {
            ChangeKind::Added | ChangeKind::Modified => {
                match T::from_fields(path, change.id.clone(), &change.fields) {
                    Ok(record) => {
                        docs.insert(change.id.clone(), record);
                    }
                    Err(err) => {
                        warn!(path, id = %change.id, error = %err, "quarantined undecodable document");
                    }
                }
            }
            ChangeKind::Removed => {
                docs.remove(&change.id);
            }
        }
    }
}

/// Full re-sort on every fold. Ties on the timestamp break on document id
/// so equal-timestamp records keep a stable relative order across
/// snapshots.
fn materialize<T: FeedRecord + Clone>(docs: &HashMap<DocumentId, T>, order: SortOrder) -> Vec<T> {
    let mut list: Vec<T> = docs.values().cloned().collect();
    list.sort_by(|a, b| {
        let by_time = match order {
            SortOrder::NewestFirst => b.created_at().cmp(&a.created_at()),
            SortOrder::OldestFirst => a.created_at().cmp(&b.created_at()),
        };
        by_time.then_with(|| a.id().cmp(b.id()))
    });
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};

    use murmur_shared::{Identity, Post, POSTS_PATH};
    use murmur_store::MemoryDocuments;

    fn author() -> Identity {
        Identity::new("acct-1", "ada", "")
    }

    async fn wait_for_len(list: &mut LiveList<Post>, len: usize) -> Vec<Post> {
        let mut snapshot = list.snapshot();
        while snapshot.len() != len {
            snapshot = list.changed().await.unwrap();
        }
        snapshot
    }

    #[tokio::test]
    async fn test_empty_collection_materializes_empty() {
        let store = Arc::new(MemoryDocuments::new());
        let mut list: LiveList<Post> =
            LiveList::open(store.clone(), POSTS_PATH, SortOrder::NewestFirst).await.unwrap();

        let snapshot = list.changed().await.unwrap();
        assert!(snapshot.is_empty());
        assert!(!list.ended());
        list.cancel().await;
    }

    #[tokio::test]
    async fn test_newest_first_regardless_of_arrival_order() {
        let store = Arc::new(MemoryDocuments::new());
        let t = |h: u32, m: u32| Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap();

        // Arrival order 10:00, 10:05, 10:02.
        store.append_at(POSTS_PATH, Post::fields(&author(), "first", ""), t(10, 0)).unwrap();
        store.append_at(POSTS_PATH, Post::fields(&author(), "third", ""), t(10, 5)).unwrap();
        store.append_at(POSTS_PATH, Post::fields(&author(), "second", ""), t(10, 2)).unwrap();

        let mut list: LiveList<Post> =
            LiveList::open(store, POSTS_PATH, SortOrder::NewestFirst).await.unwrap();
        let snapshot = wait_for_len(&mut list, 3).await;

        let texts: Vec<&str> = snapshot.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["third", "second", "first"]);
        list.cancel().await;
    }

    #[tokio::test]
    async fn test_live_additions_keep_order() {
        let store = Arc::new(MemoryDocuments::new());
        let mut list: LiveList<Post> =
            LiveList::open(store.clone(), POSTS_PATH, SortOrder::NewestFirst).await.unwrap();

        for text in ["one", "two", "three"] {
            store.append(POSTS_PATH, Post::fields(&author(), text, "")).await.unwrap();
        }
        let snapshot = wait_for_len(&mut list, 3).await;
        let texts: Vec<&str> = snapshot.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["three", "two", "one"]);
        list.cancel().await;
    }

    #[tokio::test]
    async fn test_equal_timestamps_tie_break_is_stable() {
        let store = Arc::new(MemoryDocuments::new());
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        for text in ["a", "b", "c"] {
            store.append_at(POSTS_PATH, Post::fields(&author(), text, ""), t).unwrap();
        }

        let mut list: LiveList<Post> =
            LiveList::open(store.clone(), POSTS_PATH, SortOrder::NewestFirst).await.unwrap();
        let first = wait_for_len(&mut list, 3).await;

        // A later unrelated append re-sorts; the tied trio must not shuffle.
        store.append_at(POSTS_PATH, Post::fields(&author(), "later", ""), t + chrono::Duration::minutes(1)).unwrap();
        let second = wait_for_len(&mut list, 4).await;

        let tied_before: Vec<&DocumentId> = first.iter().map(|p| &p.id).collect();
        let tied_after: Vec<&DocumentId> = second[1..].iter().map(|p| &p.id).collect();
        assert_eq!(tied_before, tied_after);
        list.cancel().await;
    }

    #[tokio::test]
    async fn test_undecodable_documents_are_quarantined() {
        let store = Arc::new(MemoryDocuments::new());
        let mut bad = Post::fields(&author(), "broken", "");
        bad.remove("avatar");
        store.append(POSTS_PATH, bad).await.unwrap();
        store.append(POSTS_PATH, Post::fields(&author(), "good", "")).await.unwrap();

        let mut list: LiveList<Post> =
            LiveList::open(store, POSTS_PATH, SortOrder::NewestFirst).await.unwrap();
        let snapshot = wait_for_len(&mut list, 1).await;
        assert_eq!(snapshot[0].text, "good");
        list.cancel().await;
    }

    #[tokio::test]
    async fn test_cancel_freezes_snapshot() {
        let store = Arc::new(MemoryDocuments::new());
        let mut list: LiveList<Post> =
            LiveList::open(store.clone(), POSTS_PATH, SortOrder::NewestFirst).await.unwrap();
        store.append(POSTS_PATH, Post::fields(&author(), "before", "")).await.unwrap();
        wait_for_len(&mut list, 1).await;

        list.cancel().await;
        store.append(POSTS_PATH, Post::fields(&author(), "after", "")).await.unwrap();
        tokio::task::yield_now().await;

        assert_eq!(list.snapshot().len(), 1);
        assert_eq!(list.snapshot()[0].text, "before");
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let store = Arc::new(MemoryDocuments::new());
        let mut list: LiveList<Post> =
            LiveList::open(store, POSTS_PATH, SortOrder::NewestFirst).await.unwrap();
        list.cancel().await;
        list.cancel().await;
    }

    #[tokio::test]
    async fn test_stale_subscription_does_not_leak_into_replacement() {
        let store = Arc::new(MemoryDocuments::new());

        let mut a: LiveList<Post> =
            LiveList::open(store.clone(), POSTS_PATH, SortOrder::NewestFirst).await.unwrap();
        a.changed().await.unwrap();
        // Teardown strictly before the replacement opens.
        a.cancel().await;

        let mut b: LiveList<Post> =
            LiveList::open(store.clone(), POSTS_PATH, SortOrder::NewestFirst).await.unwrap();
        store.append(POSTS_PATH, Post::fields(&author(), "for-b", "")).await.unwrap();
        let snapshot = wait_for_len(&mut b, 1).await;

        assert_eq!(snapshot[0].text, "for-b");
        assert!(a.snapshot().is_empty());
        b.cancel().await;
    }

    #[tokio::test]
    async fn test_store_termination_is_surfaced() {
        let store = Arc::new(MemoryDocuments::new());
        let mut list: LiveList<Post> =
            LiveList::open(store.clone(), POSTS_PATH, SortOrder::NewestFirst).await.unwrap();
        list.changed().await.unwrap();

        store.terminate_streams(POSTS_PATH);
        assert!(list.changed().await.is_err());
        assert!(list.ended());
    }
}
