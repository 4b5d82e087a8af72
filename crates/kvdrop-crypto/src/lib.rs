//! Content hashing for kvdrop.
//!
//! Provides the SHA-256 [`ContentHasher`] that turns blob bytes into a
//! [`Digest`](kvdrop_types::Digest), and the birthday-bound arithmetic in
//! [`collision`] that quantifies how often two blobs share a seven-character
//! [`Identifier`](kvdrop_types::Identifier).

pub mod collision;
pub mod hasher;

pub use collision::{blobs_for_probability, collision_probability, IDENTIFIER_SPACE};
pub use hasher::ContentHasher;
