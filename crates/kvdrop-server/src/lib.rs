//! HTTP server for kvdrop.
//!
//! `PUT /` takes a multipart form with a `data` field, stores the blob under
//! the first seven hex characters of its SHA-256 digest and answers with the
//! blob's access URL. `GET /{id}` serves it back with its recorded content
//! type and a seven-day immutable cache policy.
//!
//! The backing store is injected ([`KvdropServer::new`]); the
//! [`BlobService`] composes hashing, the collision policy, the store and the
//! optional [`EdgeCache`].

pub mod cache;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod service;

pub use cache::{CachePolicy, EdgeCache, MemoryEdgeCache};
pub use config::{CacheConfig, CompatConfig, ServerConfig, StorageConfig};
pub use error::{ServerError, ServerResult};
pub use handler::{AppState, ResourceMetadata, StoreResponse};
pub use server::KvdropServer;
pub use service::{BlobService, FetchedBlob, StoredBlob, Upload};
