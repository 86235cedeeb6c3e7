use thiserror::Error;

use murmur_store::{AuthError, StoreError, UploadError};

/// Errors surfaced by the sync engine. All are terminal at the point of
/// occurrence: nothing is retried, and failed operations leave prior valid
/// state untouched.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("write rejected: {0}")]
    Write(#[from] StoreError),

    /// The store terminated a live query's stream.
    #[error("live query ended by the store")]
    SubscriptionEnded,

    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// The operation requires a signed-in identity.
    #[error("an active session is required")]
    SignedOut,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
