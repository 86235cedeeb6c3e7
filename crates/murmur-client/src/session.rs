//! Identity session tracker.
//!
//! One tokio task consumes the identity provider's session stream and
//! mirrors every transition into the identity store by whole-value
//! replacement. The task is the store's only writer.

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use murmur_shared::Identity;
use murmur_store::{AuthProvider, SessionUser};

use crate::state::IdentityWriter;

fn identity_from(user: SessionUser) -> Identity {
    Identity {
        id: user.uid,
        display_name: user.display_name.unwrap_or_default(),
        photo_url: user.photo_url.unwrap_or_default(),
    }
}

/// Handle to the running tracker task.
///
/// [`stop`](Self::stop) joins the task, so once it returns no further
/// store writes can happen, even for a provider event already in flight.
/// Dropping the handle requests cancellation without waiting.
pub struct SessionTracker {
    cancel: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SessionTracker {
    /// Subscribe to the provider and start mirroring sessions into the
    /// store. The provider delivers the current session as the first
    /// event, so the store reflects reality as soon as that arrives.
    pub async fn spawn(provider: Arc<dyn AuthProvider>, writer: IdentityWriter) -> Self {
        let mut events = provider.subscribe_sessions().await;
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut cancel_rx => {
                        debug!("session tracker stopped");
                        break;
                    }
                    event = events.recv() => match event {
                        Some(Some(user)) => writer.replace(identity_from(user)),
                        Some(None) => writer.clear(),
                        None => {
                            // Transport failure or provider shutdown. Not
                            // retried; the provider surfaces errors on its
                            // own channel.
                            warn!("session stream ended");
                            break;
                        }
                    }
                }
            }
        });

        Self {
            cancel: Some(cancel_tx),
            task: Some(task),
        }
    }

    /// Stop mirroring. Idempotent. Awaits the tracker task, so no session
    /// event can reach the store after this returns.
    pub async fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SessionTracker {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }
}
