//! Backing key-value store contract for kvdrop.
//!
//! The backing store is an external key-value service: it maps an
//! [`Identifier`](kvdrop_types::Identifier) to the blob's bytes plus a small
//! JSON metadata record. This crate defines what kvdrop consumes from such a
//! service and nothing about how the service stores data.
//!
//! # Contract
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - `put(id, body, metadata)`: Store bytes and metadata under a key
//! - `get_with_metadata(id)`: Fetch both, or `None` when absent
//! - `list(prefix)`: Enumerate keys (capability probe only)
//!
//! - [`InMemoryBlobStore`] -- map-backed store for the dev server and tests
//!
//! # Design Rules
//!
//! 1. Metadata is validated when it crosses back from the store, never trusted.
//! 2. An identifier clash between different digests is handled by one
//!    explicit [`CollisionPolicy`], applied by [`CollisionPolicy::apply`].
//! 3. Visibility of a `put` to a later `get` is whatever the backend provides;
//!    callers must not assume read-your-writes.
//! 4. Store failures are surfaced to the caller, never retried here.

pub mod encoding;
pub mod entry;
pub mod error;
pub mod memory;
pub mod policy;
pub mod traits;

pub use entry::StoredEntry;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryBlobStore;
pub use policy::{CollisionPolicy, WriteDecision, WriteOutcome};
pub use traits::BlobStore;
