use kvdrop_types::{Digest, Identifier};

/// Errors from backing-store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not complete the operation.
    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    /// A stored record is malformed or does not match its key.
    #[error("corrupt entry {id}: {reason}")]
    CorruptEntry { id: Identifier, reason: String },

    /// A different blob already occupies the identifier.
    #[error("identifier {id} already holds {existing}, refusing to store {incoming}")]
    Collision {
        id: Identifier,
        existing: Digest,
        incoming: Digest,
    },

    /// Encoding the body for storage failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
