//! # murmur-store
//!
//! Contracts for the three external collaborators of the murmur sync
//! engine: the identity provider, the binary object store, and the
//! document store. Each contract is an async trait so the engine can hold
//! backends behind `Arc<dyn …>` and be tested against the in-memory
//! implementations in [`memory`].
//!
//! The in-memory backends are complete: the document store assigns
//! server-side timestamps from a strictly monotonic clock and fans out
//! change batches to live subscribers, which is everything the engine's
//! ordering guarantees rely on.

pub mod auth;
pub mod documents;
pub mod memory;
pub mod objects;

mod error;

pub use auth::{AuthProvider, FederatedProvider, SessionEvents, SessionUser};
pub use documents::{ChangeBatch, ChangeBatches, ChangeKind, DocChange, DocumentStore};
pub use error::{AuthError, StoreError, UploadError};
pub use memory::{MemoryAuth, MemoryDocuments, MemoryObjects};
pub use objects::{ObjectStore, UploadEvent, UploadEvents};
