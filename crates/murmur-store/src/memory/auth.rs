use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::auth::{AuthProvider, FederatedProvider, SessionEvents, SessionUser};
use crate::error::AuthError;

const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    uid: String,
    password: String,
    display_name: Option<String>,
    photo_url: Option<String>,
}

impl Account {
    fn session_user(&self) -> SessionUser {
        SessionUser {
            uid: self.uid.clone(),
            display_name: self.display_name.clone(),
            photo_url: self.photo_url.clone(),
        }
    }
}

struct Inner {
    /// Accounts keyed by email.
    accounts: HashMap<String, Account>,
    /// Email of the signed-in account, if any.
    current: Option<String>,
    watchers: Vec<mpsc::UnboundedSender<Option<SessionUser>>>,
    cancel_next_popup: bool,
    reset_requests: Vec<String>,
}

impl Inner {
    fn current_user(&self) -> Option<SessionUser> {
        self.current
            .as_ref()
            .and_then(|email| self.accounts.get(email))
            .map(Account::session_user)
    }

    /// Deliver the current session to every live stream, in order.
    fn broadcast(&mut self) {
        let user = self.current_user();
        self.watchers.retain(|tx| tx.send(user.clone()).is_ok());
    }
}

/// In-memory identity provider.
pub struct MemoryAuth {
    inner: Mutex<Inner>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                accounts: HashMap::new(),
                current: None,
                watchers: Vec::new(),
                cancel_next_popup: false,
                reset_requests: Vec::new(),
            }),
        }
    }

    /// Make the next federated sign-in behave as a user-cancelled popup.
    pub fn cancel_next_popup(&self) {
        self.inner.lock().expect("lock poisoned").cancel_next_popup = true;
    }

    /// Emails that password-reset delivery was requested for.
    pub fn reset_requests(&self) -> Vec<String> {
        self.inner.lock().expect("lock poisoned").reset_requests.clone()
    }
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn subscribe_sessions(&self) -> SessionEvents {
        let mut inner = self.inner.lock().expect("lock poisoned");
        let (tx, rx) = mpsc::unbounded_channel();
        // The current session is always the first item on a new stream.
        let _ = tx.send(inner.current_user());
        inner.watchers.push(tx);
        SessionEvents::new(rx)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SessionUser, AuthError> {
        let mut inner = self.inner.lock().expect("lock poisoned");
        let user = match inner.accounts.get(email) {
            Some(account) if account.password == password => account.session_user(),
            // Unknown email and wrong password are indistinguishable to the
            // caller, as real providers report them.
            _ => return Err(AuthError::InvalidCredentials),
        };
        inner.current = Some(email.to_string());
        inner.broadcast();
        debug!(uid = %user.uid, "signed in");
        Ok(user)
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<SessionUser, AuthError> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        let mut inner = self.inner.lock().expect("lock poisoned");
        if inner.accounts.contains_key(email) {
            return Err(AuthError::EmailInUse);
        }
        let account = Account {
            uid: Uuid::new_v4().to_string(),
            password: password.to_string(),
            display_name: None,
            photo_url: None,
        };
        let user = account.session_user();
        inner.accounts.insert(email.to_string(), account);
        inner.current = Some(email.to_string());
        inner.broadcast();
        debug!(uid = %user.uid, "account created");
        Ok(user)
    }

    async fn sign_in_federated(
        &self,
        provider: &FederatedProvider,
    ) -> Result<SessionUser, AuthError> {
        let mut inner = self.inner.lock().expect("lock poisoned");
        if inner.cancel_next_popup {
            inner.cancel_next_popup = false;
            return Err(AuthError::PopupCancelled);
        }
        // One federated account per provider domain; created on first use.
        let email = format!("federated:{}", provider.name);
        let user = inner
            .accounts
            .entry(email.clone())
            .or_insert_with(|| Account {
                uid: Uuid::new_v4().to_string(),
                password: String::new(),
                display_name: None,
                photo_url: None,
            })
            .session_user();
        inner.current = Some(email);
        inner.broadcast();
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let mut inner = self.inner.lock().expect("lock poisoned");
        if inner.current.take().is_some() {
            inner.broadcast();
        }
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let mut inner = self.inner.lock().expect("lock poisoned");
        if !inner.accounts.contains_key(email) {
            return Err(AuthError::UnknownUser);
        }
        inner.reset_requests.push(email.to_string());
        Ok(())
    }

    async fn update_profile(
        &self,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<(), AuthError> {
        let mut inner = self.inner.lock().expect("lock poisoned");
        let email = inner.current.clone().ok_or(AuthError::NotSignedIn)?;
        let account = inner
            .accounts
            .get_mut(&email)
            .ok_or(AuthError::NotSignedIn)?;
        if let Some(name) = display_name {
            account.display_name = Some(name.to_string());
        }
        if let Some(url) = photo_url {
            account.photo_url = Some(url.to_string());
        }
        // Profile replaces are session transitions: re-emit the record.
        inner.broadcast();
        Ok(())
    }
}
