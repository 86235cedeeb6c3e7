//! # murmur-client
//!
//! Real-time synchronization engine for the murmur social feed. Projects
//! the remote document store into local materialized lists via live
//! subscriptions, sequences multi-step writes (image upload strictly
//! before the dependent document append), and keeps the authenticated
//! identity mirrored into process-wide state through a long-lived
//! session stream.

pub mod auth;
pub mod session;
pub mod state;
pub mod subscriber;
pub mod upload;
pub mod writer;

mod error;

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use murmur_shared::{comments_path, Comment, DocumentId, Post, POSTS_PATH};
use murmur_store::{
    AuthProvider, DocumentStore, MemoryAuth, MemoryDocuments, MemoryObjects, ObjectStore,
};

pub use auth::AuthFlows;
pub use error::{ClientError, Result};
pub use session::SessionTracker;
pub use state::IdentityStore;
pub use subscriber::{LiveList, SortOrder};
pub use upload::Uploader;
pub use writer::{FeedWriter, NamedBlob};

/// Install a default tracing subscriber for embedders that do not bring
/// their own. `RUST_LOG` takes precedence.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("murmur_client=debug,murmur_store=info,warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// The three external collaborators the engine runs against.
#[derive(Clone)]
pub struct Backends {
    pub auth: Arc<dyn AuthProvider>,
    pub objects: Arc<dyn ObjectStore>,
    pub documents: Arc<dyn DocumentStore>,
}

impl Backends {
    /// Fully in-memory backends, for tests and local development.
    pub fn in_memory() -> Self {
        Self {
            auth: Arc::new(MemoryAuth::new()),
            objects: Arc::new(MemoryObjects::new()),
            documents: Arc::new(MemoryDocuments::new()),
        }
    }
}

/// Engine facade: owns the session tracker and hands out the components
/// views need.
pub struct MurmurClient {
    backends: Backends,
    identity: IdentityStore,
    tracker: SessionTracker,
}

impl MurmurClient {
    /// Wire the session tracker to the identity store and start mirroring
    /// sessions.
    pub async fn connect(backends: Backends) -> Self {
        let (identity_writer, identity) = state::identity_store();
        let tracker = SessionTracker::spawn(backends.auth.clone(), identity_writer).await;
        Self {
            backends,
            identity,
            tracker,
        }
    }

    /// Read-only view of the current identity.
    pub fn identity(&self) -> IdentityStore {
        self.identity.clone()
    }

    pub fn auth(&self) -> AuthFlows {
        AuthFlows::new(
            self.backends.auth.clone(),
            Uploader::new(self.backends.objects.clone()),
        )
    }

    pub fn writer(&self) -> FeedWriter {
        FeedWriter::new(
            self.backends.documents.clone(),
            Uploader::new(self.backends.objects.clone()),
            self.identity.clone(),
        )
    }

    /// Open the main feed, newest first.
    pub async fn feed(&self) -> Result<LiveList<Post>> {
        LiveList::open(self.backends.documents.clone(), POSTS_PATH, SortOrder::NewestFirst).await
    }

    /// Open a post's comment thread, newest first.
    ///
    /// A view switching between posts must cancel its previous list before
    /// opening the next one; use [`swap_comments`](Self::swap_comments) to
    /// get that ordering for free.
    pub async fn comments(&self, post_id: &DocumentId) -> Result<LiveList<Comment>> {
        LiveList::open(
            self.backends.documents.clone(),
            &comments_path(post_id),
            SortOrder::NewestFirst,
        )
        .await
    }

    /// Replace a comment subscription: tears the old one down to
    /// completion strictly before the new one opens, so a stale stream can
    /// never cross-wire into the replacement.
    pub async fn swap_comments(
        &self,
        current: Option<LiveList<Comment>>,
        post_id: &DocumentId,
    ) -> Result<LiveList<Comment>> {
        if let Some(mut old) = current {
            old.cancel().await;
        }
        self.comments(post_id).await
    }

    /// Stop the session tracker. After this returns no session event can
    /// reach the identity store. Live lists are cancelled individually by
    /// their owners.
    pub async fn shutdown(mut self) {
        self.tracker.stop().await;
    }
}
