//! Identity provider contract.
//!
//! The provider owns credential verification and session persistence. The
//! engine consumes it through [`AuthProvider::subscribe_sessions`], a
//! stream that yields the current session immediately and then exactly one
//! item per transition (sign-in, sign-out, provider-side profile replace).

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::AuthError;

/// Provider-native user record, as emitted on the session stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    /// Opaque account identifier, stable per account.
    pub uid: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Configuration for a federated (popup) sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedProvider {
    /// Provider domain, e.g. `google.com`.
    pub name: String,
}

impl FederatedProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Stream of session transitions. `None` items mean "signed out".
///
/// Dropping the stream unsubscribes; the provider stops delivering into
/// it. The outer `None` from [`recv`](Self::recv) means the provider
/// closed the stream.
pub struct SessionEvents {
    rx: mpsc::UnboundedReceiver<Option<SessionUser>>,
}

impl SessionEvents {
    pub fn new(rx: mpsc::UnboundedReceiver<Option<SessionUser>>) -> Self {
        Self { rx }
    }

    pub async fn recv(&mut self) -> Option<Option<SessionUser>> {
        self.rx.recv().await
    }
}

/// Contract with the external identity provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Open a session stream. The current session (or `None`) is delivered
    /// as the first item.
    async fn subscribe_sessions(&self) -> SessionEvents;

    async fn sign_in(&self, email: &str, password: &str) -> Result<SessionUser, AuthError>;

    async fn create_account(&self, email: &str, password: &str) -> Result<SessionUser, AuthError>;

    async fn sign_in_federated(
        &self,
        provider: &FederatedProvider,
    ) -> Result<SessionUser, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError>;

    /// Replace profile fields on the current session. The provider re-emits
    /// a session event carrying the updated record.
    async fn update_profile(
        &self,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<(), AuthError>;
}
