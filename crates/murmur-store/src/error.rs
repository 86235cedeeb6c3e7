use thiserror::Error;

/// Errors from the identity provider. None of these are retried, and none
/// may mutate engine state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account already exists for this email")]
    EmailInUse,

    #[error("password is too weak (minimum 6 characters)")]
    WeakPassword,

    #[error("federated sign-in popup was cancelled")]
    PopupCancelled,

    #[error("no account registered for this email")]
    UnknownUser,

    #[error("no active session")]
    NotSignedIn,

    /// Transport-level failure surfaced by the provider itself.
    #[error("identity provider error: {0}")]
    Provider(String),
}

/// Errors from the binary object store. Any of these terminates the
/// upload; a dependent document append must not proceed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("no object stored at '{0}'")]
    NotFound(String),

    /// The upload's event stream closed without a terminal event.
    #[error("upload interrupted before completion")]
    Interrupted,
}

/// Errors from the document store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store's rules engine rejected the operation.
    #[error("permission denied for '{0}'")]
    PermissionDenied(String),

    #[error("invalid collection path: {0}")]
    InvalidPath(String),

    #[error("append rejected: {0}")]
    Rejected(String),
}
