use async_trait::async_trait;
use bytes::Bytes;

use kvdrop_types::{BlobMetadata, Identifier};

use crate::entry::StoredEntry;
use crate::error::StoreResult;

/// Key-value backing store holding blobs and their metadata.
///
/// This is a consumed capability: kvdrop relies on these semantics and does
/// not reimplement them.
/// - Keys are [`Identifier`]s; values are opaque bytes with a JSON metadata
///   record attached.
/// - `put` replaces whatever was stored under the key. Deciding whether a put
///   should happen at all is the caller's job (see
///   [`CollisionPolicy`](crate::CollisionPolicy)).
/// - Consistency is inherited from the backend. A KV service may be
///   eventually consistent, so a `get` right after a `put` (especially from
///   another location) can still return `None` or the previous value.
/// - Implementations return [`StoreError::CorruptEntry`](crate::StoreError)
///   when the metadata read back fails [`BlobMetadata::from_wire`].
/// - Every failure is returned to the caller; implementations do not retry.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `body` with `metadata` under `id`.
    async fn put(&self, id: &Identifier, body: Bytes, metadata: &BlobMetadata) -> StoreResult<()>;

    /// Fetch the bytes and metadata stored under `id`.
    ///
    /// Returns `Ok(None)` if nothing is stored under the key.
    async fn get_with_metadata(&self, id: &Identifier) -> StoreResult<Option<StoredEntry>>;

    /// List stored identifiers, optionally restricted to a key prefix,
    /// in ascending order.
    async fn list(&self, prefix: Option<&str>) -> StoreResult<Vec<Identifier>>;

    /// Fetch only the metadata stored under `id`.
    ///
    /// Default implementation goes through `get_with_metadata()`. Backends
    /// with a cheaper metadata-only lookup may override.
    async fn get_metadata(&self, id: &Identifier) -> StoreResult<Option<BlobMetadata>> {
        Ok(self.get_with_metadata(id).await?.map(|entry| entry.metadata))
    }
}
