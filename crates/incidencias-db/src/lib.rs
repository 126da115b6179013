//! Incidencias Store Library
//!
//! Document store adapter for incidence reports. The [`IncidenceStore`] trait
//! is the only seam the HTTP layer depends on; [`MongoIncidenceStore`] is the
//! production backend and `InMemoryIncidenceStore` (feature `store-memory`)
//! serves tests and local development.
//!
//! The adapter owns every store-assigned field: the opaque `id` and the
//! `createdAt`/`updatedAt` timestamps are set here, never by callers.

#[cfg(feature = "store-memory")]
pub mod memory;
pub mod mongo;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "store-memory")]
pub use memory::{InMemoryIncidenceStore, StoredIncidence};
pub use mongo::{MongoIncidenceStore, COLLECTION_NAME};
pub use traits::{IncidenceStore, StoreError, StoreResult};
