//! In-memory reference backends for the three external contracts.
//!
//! These back the engine's test suite and local development. They honor
//! the same ordering and termination guarantees the real services give:
//! monotonic server timestamps, in-order change-batch delivery, and
//! exactly one terminal event per upload. Each backend also offers
//! failure-injection hooks so error paths can be exercised.

mod auth;
mod documents;
mod objects;

pub use auth::MemoryAuth;
pub use documents::MemoryDocuments;
pub use objects::MemoryObjects;
