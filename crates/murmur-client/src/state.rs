//! Process-wide identity state.
//!
//! The singleton [`Identity`] lives in a `tokio::sync::watch` channel.
//! Mutation goes through [`IdentityWriter`], which only the session
//! tracker holds; everything else gets the read-only [`IdentityStore`]
//! view. Every mutation is a whole-value replacement, so readers can never
//! observe a partially updated identity.

use tokio::sync::watch;
use tracing::debug;

use murmur_shared::Identity;

/// Create the identity singleton. The writer goes to the session tracker,
/// the store to everyone else.
pub fn identity_store() -> (IdentityWriter, IdentityStore) {
    let (tx, rx) = watch::channel(Identity::signed_out());
    (IdentityWriter { tx }, IdentityStore { rx })
}

/// Write half of the identity singleton. Single-writer: held exclusively
/// by the session tracker's callback path.
pub struct IdentityWriter {
    tx: watch::Sender<Identity>,
}

impl IdentityWriter {
    /// Replace the identity wholesale.
    pub fn replace(&self, identity: Identity) {
        debug!(id = %identity.id, "identity replaced");
        let _ = self.tx.send(identity);
    }

    /// Replace with the signed-out sentinel.
    pub fn clear(&self) {
        self.replace(Identity::signed_out());
    }

    /// Out-of-band profile refresh: keep the account id, replace only the
    /// profile fields. Still a single atomic replacement.
    pub fn merge_profile(&self, display_name: &str, photo_url: &str) {
        self.tx
            .send_modify(|identity| *identity = identity.merge_profile(display_name, photo_url));
    }
}

/// Read-only view of the identity singleton. Cheap to clone.
#[derive(Clone)]
pub struct IdentityStore {
    rx: watch::Receiver<Identity>,
}

impl IdentityStore {
    /// The identity as of now. The signed-out sentinel when no session
    /// exists.
    pub fn current(&self) -> Identity {
        self.rx.borrow().clone()
    }

    /// Wait until the identity changes from the last value this view
    /// observed. Returns the new value. Errors are impossible while the
    /// writer is alive; after engine shutdown this future stays pending
    /// on the final value.
    pub async fn changed(&mut self) -> Identity {
        if self.rx.changed().await.is_ok() {
            self.rx.borrow_and_update().clone()
        } else {
            // Writer dropped: the last value is final.
            self.rx.borrow().clone()
        }
    }
}
