//! Authentication flows.
//!
//! Thin orchestration over the identity provider: sign-in, registration
//! (with optional avatar upload), federated popup sign-in, password reset.
//! Outcomes reach the rest of the app through the session tracker; these
//! calls only return errors for the initiating caller to surface.

use std::sync::Arc;

use tracing::info;

use murmur_store::{AuthProvider, FederatedProvider};

use crate::error::{ClientError, Result};
use crate::upload::{Uploader, AVATARS_DIR};
use crate::writer::NamedBlob;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone)]
pub struct AuthFlows {
    provider: Arc<dyn AuthProvider>,
    uploader: Uploader,
}

impl AuthFlows {
    pub fn new(provider: Arc<dyn AuthProvider>, uploader: Uploader) -> Self {
        Self { provider, uploader }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<()> {
        if email.is_empty() {
            return Err(ClientError::InvalidInput("email must not be empty"));
        }
        self.provider.sign_in(email, password).await?;
        Ok(())
    }

    /// Create an account, upload the avatar if one was chosen, and push
    /// the profile to the provider. Returns the resolved avatar URL (empty
    /// when none was uploaded) so callers can reflect it immediately.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
        avatar: Option<NamedBlob>,
    ) -> Result<String> {
        if email.is_empty() {
            return Err(ClientError::InvalidInput("email must not be empty"));
        }
        if username.is_empty() {
            return Err(ClientError::InvalidInput("username must not be empty"));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(ClientError::InvalidInput("password must be at least 6 characters"));
        }

        self.provider.create_account(email, password).await?;

        let photo_url = match avatar {
            Some(blob) => {
                self.uploader
                    .put(AVATARS_DIR, &blob.file_name, blob.data)
                    .await?
            }
            None => String::new(),
        };

        // The provider re-emits the session with the new profile, which the
        // tracker mirrors into the identity store.
        self.provider
            .update_profile(Some(username), Some(&photo_url))
            .await?;
        info!(username, has_avatar = !photo_url.is_empty(), "account registered");
        Ok(photo_url)
    }

    pub async fn sign_in_federated(&self, provider: &FederatedProvider) -> Result<()> {
        self.provider.sign_in_federated(provider).await?;
        Ok(())
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.provider.sign_out().await?;
        Ok(())
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<()> {
        if email.is_empty() {
            return Err(ClientError::InvalidInput("email must not be empty"));
        }
        self.provider.send_password_reset(email).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use murmur_store::{AuthError, MemoryAuth, MemoryObjects};

    fn flows() -> (Arc<MemoryAuth>, Arc<MemoryObjects>, AuthFlows) {
        let auth = Arc::new(MemoryAuth::new());
        let objects = Arc::new(MemoryObjects::new());
        let flows = AuthFlows::new(auth.clone(), Uploader::new(objects.clone()));
        (auth, objects, flows)
    }

    #[tokio::test]
    async fn test_register_with_avatar_updates_profile() {
        let (auth, _objects, flows) = flows();
        let url = flows
            .register(
                "ada@example.com",
                "hunter22",
                "Ada",
                Some(NamedBlob::new("me.png", &b"avatar"[..])),
            )
            .await
            .unwrap();
        assert!(url.contains("avatars/"));

        let mut events = auth.subscribe_sessions().await;
        let user = events.recv().await.unwrap().unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Ada"));
        assert_eq!(user.photo_url.as_deref(), Some(url.as_str()));
    }

    #[tokio::test]
    async fn test_register_without_avatar() {
        let (_auth, _objects, flows) = flows();
        let url = flows
            .register("ada@example.com", "hunter22", "Ada", None)
            .await
            .unwrap();
        assert!(url.is_empty());
    }

    #[tokio::test]
    async fn test_short_password_rejected_client_side() {
        let (_auth, _objects, flows) = flows();
        let err = flows
            .register("ada@example.com", "short", "Ada", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_avatar_upload_failure_surfaces() {
        let (_auth, objects, flows) = flows();
        objects.fail_next_upload();
        let err = flows
            .register(
                "ada@example.com",
                "hunter22",
                "Ada",
                Some(NamedBlob::new("me.png", &b"avatar"[..])),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Upload(_)));
    }

    #[tokio::test]
    async fn test_popup_cancellation_propagates() {
        let (auth, _objects, flows) = flows();
        auth.cancel_next_popup();
        let err = flows
            .sign_in_federated(&FederatedProvider::new("google.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Auth(AuthError::PopupCancelled)));
    }

    #[tokio::test]
    async fn test_password_reset() {
        let (auth, _objects, flows) = flows();
        flows
            .register("ada@example.com", "hunter22", "Ada", None)
            .await
            .unwrap();
        flows.send_password_reset("ada@example.com").await.unwrap();
        assert_eq!(auth.reset_requests(), vec!["ada@example.com".to_string()]);
    }
}
