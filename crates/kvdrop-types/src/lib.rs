//! Foundation types for kvdrop.
//!
//! kvdrop stores blobs in a key-value backing store under a short public
//! identifier derived from the blob's SHA-256 digest. Every other kvdrop crate
//! depends on `kvdrop-types`.
//!
//! # Key Types
//!
//! - [`Digest`]: Full 32-byte SHA-256 digest of a blob's bytes
//! - [`Identifier`]: First [`IDENTIFIER_LEN`] hex characters of a digest
//! - [`BlobMetadata`]: Digest, content type and at-rest encoding stored next
//!   to the blob
//! - [`ContentEncoding`]: How the stored bytes are encoded

pub mod digest;
pub mod error;
pub mod identifier;
pub mod metadata;

pub use digest::Digest;
pub use error::TypeError;
pub use identifier::{Identifier, IDENTIFIER_LEN};
pub use metadata::{BlobMetadata, ContentEncoding, DEFAULT_CONTENT_TYPE};
