//! Document store contract.
//!
//! The store is append-mostly: the engine only ever appends documents and
//! opens live queries. A live query is a cancelable stream of change
//! batches; the first batch replays the collection's current contents as
//! `Added` changes (an empty collection yields one empty batch, not an
//! error), and subsequent batches arrive in the order the store commits
//! them.

use async_trait::async_trait;
use tokio::sync::mpsc;

use murmur_shared::{DocumentId, Fields};

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// One document-level change inside a batch.
#[derive(Debug, Clone)]
pub struct DocChange {
    pub kind: ChangeKind,
    pub id: DocumentId,
    pub fields: Fields,
}

/// A batch of changes committed together by the store.
#[derive(Debug, Clone, Default)]
pub struct ChangeBatch {
    pub changes: Vec<DocChange>,
}

/// Live query stream. Dropping it cancels the query at the store; a
/// [`recv`](Self::recv) of `None` means the store terminated the stream.
pub struct ChangeBatches {
    rx: mpsc::UnboundedReceiver<ChangeBatch>,
}

impl ChangeBatches {
    pub fn new(rx: mpsc::UnboundedReceiver<ChangeBatch>) -> Self {
        Self { rx }
    }

    pub async fn recv(&mut self) -> Option<ChangeBatch> {
        self.rx.recv().await
    }
}

/// Contract with the external document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append a document. The store assigns the id and resolves a null
    /// `timestamp` field with its own clock, which is the sole ordering
    /// authority across clients.
    async fn append(&self, collection_path: &str, fields: Fields) -> Result<DocumentId, StoreError>;

    /// Open a live query over a collection.
    async fn subscribe(&self, collection_path: &str) -> Result<ChangeBatches, StoreError>;
}
