use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use kvdrop_crypto::ContentHasher;
use kvdrop_store::{encoding, BlobStore, CollisionPolicy, WriteOutcome};
use kvdrop_types::{BlobMetadata, ContentEncoding, Digest, Identifier};

use crate::cache::{EdgeCache, MemoryEdgeCache};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// A fully buffered upload.
#[derive(Clone, Debug)]
pub struct Upload {
    pub bytes: Bytes,
    /// Content type declared by the client, if any.
    pub content_type: Option<String>,
}

impl Upload {
    pub fn new(bytes: impl Into<Bytes>, content_type: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
        }
    }
}

/// Result of a successful store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlob {
    pub identifier: Identifier,
    pub digest: Digest,
    pub content_type: String,
    pub outcome: WriteOutcome,
}

/// A blob ready to be sent to a client: the stored bytes and how to label
/// them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedBlob {
    pub body: Bytes,
    pub content_type: String,
    /// Encoding of `body` as stored; sent as `Content-Encoding` when not
    /// identity.
    pub encoding: ContentEncoding,
}

/// Store and fetch orchestration over an injected backing store.
///
/// Holds no state of its own beyond the injected store and cache handles;
/// each call is independent.
pub struct BlobService {
    store: Arc<dyn BlobStore>,
    cache: Option<Arc<dyn EdgeCache>>,
    policy: CollisionPolicy,
    encoding: ContentEncoding,
    verify_on_read: bool,
}

impl BlobService {
    /// Service with the default policy, no at-rest encoding and no cache.
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            cache: None,
            policy: CollisionPolicy::default(),
            encoding: ContentEncoding::Identity,
            verify_on_read: true,
        }
    }

    pub fn from_config(store: Arc<dyn BlobStore>, config: &ServerConfig) -> Self {
        let encoding = if config.storage.compress {
            ContentEncoding::Gzip
        } else {
            ContentEncoding::Identity
        };
        let mut service = Self::new(store)
            .with_policy(config.collision_policy)
            .with_encoding(encoding)
            .with_verify_on_read(config.storage.verify_on_read);
        if config.cache.enabled {
            service = service.with_cache(Arc::new(MemoryEdgeCache::new(config.cache.max_entries)));
        }
        service
    }

    pub fn with_cache(mut self, cache: Arc<dyn EdgeCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_policy(mut self, policy: CollisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_encoding(mut self, encoding: ContentEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_verify_on_read(mut self, verify: bool) -> Self {
        self.verify_on_read = verify;
        self
    }

    pub fn policy(&self) -> CollisionPolicy {
        self.policy
    }

    /// Hash the upload, derive its identifier and write it to the store
    /// under the collision policy. The edge cache is not consulted.
    pub async fn store_blob(&self, upload: Upload) -> ServerResult<StoredBlob> {
        let (digest, id) = ContentHasher::hash_and_derive(&upload.bytes);
        let metadata = BlobMetadata::new(digest, upload.content_type.unwrap_or_default())
            .with_encoding(self.encoding);
        debug!(
            %id,
            size = upload.bytes.len(),
            content_type = %metadata.content_type,
            "storing blob"
        );

        let body = encoding::encode(self.encoding, &upload.bytes)?;
        let outcome = self
            .policy
            .apply(self.store.as_ref(), &id, body, &metadata)
            .await?;
        info!(%id, %digest, ?outcome, "blob stored");

        Ok(StoredBlob {
            identifier: id,
            digest,
            content_type: metadata.content_type,
            outcome,
        })
    }

    /// Resolve a client-supplied identifier to a blob.
    ///
    /// Strings that are not identifiers are reported as not found without a
    /// store round-trip.
    pub async fn fetch_blob(&self, raw_id: &str) -> ServerResult<FetchedBlob> {
        let id = Identifier::parse(raw_id).map_err(|_| ServerError::NotFound(raw_id.to_string()))?;

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.lookup(&id).await {
                debug!(%id, "edge cache hit");
                return Ok(hit);
            }
            debug!(%id, "edge cache miss");
        }

        let entry = self
            .store
            .get_with_metadata(&id)
            .await?
            .ok_or_else(|| ServerError::NotFound(id.to_string()))?;
        entry.verify(&id, self.verify_on_read)?;

        let blob = FetchedBlob {
            body: entry.body,
            content_type: entry.metadata.content_type,
            encoding: entry.metadata.encoding,
        };
        if let Some(cache) = &self.cache {
            cache.store(&id, blob.clone()).await;
        }
        Ok(blob)
    }
}

impl std::fmt::Debug for BlobService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobService")
            .field("policy", &self.policy)
            .field("encoding", &self.encoding)
            .field("verify_on_read", &self.verify_on_read)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use kvdrop_store::{InMemoryBlobStore, StoreError, StoreResult, StoredEntry};

    /// Backing store that is always down.
    struct UnavailableStore;

    #[async_trait]
    impl BlobStore for UnavailableStore {
        async fn put(&self, _: &Identifier, _: Bytes, _: &BlobMetadata) -> StoreResult<()> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn get_with_metadata(&self, _: &Identifier) -> StoreResult<Option<StoredEntry>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn list(&self, _: Option<&str>) -> StoreResult<Vec<Identifier>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    /// In-memory store that counts reads and writes.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryBlobStore,
        reads: AtomicUsize,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl BlobStore for CountingStore {
        async fn put(&self, id: &Identifier, body: Bytes, meta: &BlobMetadata) -> StoreResult<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.put(id, body, meta).await
        }
        async fn get_with_metadata(&self, id: &Identifier) -> StoreResult<Option<StoredEntry>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_with_metadata(id).await
        }
        async fn list(&self, prefix: Option<&str>) -> StoreResult<Vec<Identifier>> {
            self.inner.list(prefix).await
        }
    }

    fn text(body: &'static [u8]) -> Upload {
        Upload::new(Bytes::from_static(body), Some("text/plain".into()))
    }

    #[tokio::test]
    async fn store_then_fetch_roundtrip() {
        let service = BlobService::new(Arc::new(InMemoryBlobStore::new()));
        let stored = service.store_blob(text(b"hello")).await.unwrap();
        assert_eq!(stored.identifier.as_str(), "2cf24db");
        assert_eq!(
            stored.digest.to_hex(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(stored.outcome, WriteOutcome::Written);

        let fetched = service.fetch_blob("2cf24db").await.unwrap();
        assert_eq!(fetched.body, Bytes::from_static(b"hello"));
        assert_eq!(fetched.content_type, "text/plain");
        assert_eq!(fetched.encoding, ContentEncoding::Identity);
    }

    #[tokio::test]
    async fn storing_twice_yields_same_identifier() {
        let store = Arc::new(CountingStore::default());
        let service = BlobService::new(store.clone());
        let first = service.store_blob(text(b"twice")).await.unwrap();
        let second = service.store_blob(text(b"twice")).await.unwrap();
        assert_eq!(first.identifier, second.identifier);
        assert_eq!(first.digest, second.digest);
        assert_eq!(second.outcome, WriteOutcome::AlreadyPresent);
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_content_type_defaults() {
        let service = BlobService::new(Arc::new(InMemoryBlobStore::new()));
        let stored = service.store_blob(Upload::new(&b"x"[..], None)).await.unwrap();
        assert_eq!(stored.content_type, "application/octet-stream");
        let fetched = service.fetch_blob(stored.identifier.as_str()).await.unwrap();
        assert_eq!(fetched.content_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn empty_blob_is_storable() {
        let service = BlobService::new(Arc::new(InMemoryBlobStore::new()));
        let stored = service.store_blob(text(b"")).await.unwrap();
        assert_eq!(stored.identifier.as_str(), "e3b0c44");
        let fetched = service.fetch_blob("e3b0c44").await.unwrap();
        assert!(fetched.body.is_empty());
    }

    #[tokio::test]
    async fn unknown_identifier_is_not_found() {
        let service = BlobService::new(Arc::new(InMemoryBlobStore::new()));
        let err = service.fetch_blob("0000000").await.unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
    }

    #[tokio::test]
    async fn malformed_identifier_skips_the_store() {
        let store = Arc::new(CountingStore::default());
        let service = BlobService::new(store.clone());
        let err = service.fetch_blob("favicon.ico").await.unwrap_err();
        assert!(matches!(err, ServerError::NotFound(_)));
        assert_eq!(store.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn store_failures_surface_as_unavailable() {
        let service = BlobService::new(Arc::new(UnavailableStore));
        let err = service.store_blob(text(b"hello")).await.unwrap_err();
        assert!(matches!(err, ServerError::StoreUnavailable(_)));
        let err = service.fetch_blob("2cf24db").await.unwrap_err();
        assert!(matches!(err, ServerError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn overwritten_identifier_serves_cached_blob_until_expiry() {
        // SHA-256 of both starts with 7b2508a.
        let first: &'static [u8] = b"kvdrop-collision-1728";
        let second: &'static [u8] = b"kvdrop-collision-12717";

        let store = Arc::new(InMemoryBlobStore::new());
        let service = BlobService::new(store.clone())
            .with_policy(CollisionPolicy::Overwrite)
            .with_cache(Arc::new(MemoryEdgeCache::new(16)));

        let stored = service.store_blob(text(first)).await.unwrap();
        assert_eq!(stored.identifier.as_str(), "7b2508a");
        assert_eq!(service.fetch_blob("7b2508a").await.unwrap().body, first);

        let replaced = service.store_blob(text(second)).await.unwrap();
        assert_eq!(replaced.identifier, stored.identifier);
        assert_eq!(replaced.outcome, WriteOutcome::Written);

        // The store holds the new blob; the edge cache still answers with the old one.
        let id = Identifier::parse("7b2508a").unwrap();
        let entry = store.get_with_metadata(&id).await.unwrap().unwrap();
        assert_eq!(entry.body, second);
        assert_eq!(service.fetch_blob("7b2508a").await.unwrap().body, first);

        let uncached = BlobService::new(store).with_policy(CollisionPolicy::Overwrite);
        assert_eq!(uncached.fetch_blob("7b2508a").await.unwrap().body, second);
    }

    #[tokio::test]
    async fn overwrite_policy_writes_without_reading() {
        let store = Arc::new(CountingStore::default());
        let service = BlobService::new(store.clone()).with_policy(CollisionPolicy::Overwrite);
        service.store_blob(text(b"a")).await.unwrap();
        service.store_blob(text(b"a")).await.unwrap();
        assert_eq!(store.reads.load(Ordering::SeqCst), 0);
        assert_eq!(store.writes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cache_serves_repeat_reads() {
        let store = Arc::new(CountingStore::default());
        let service =
            BlobService::new(store.clone()).with_cache(Arc::new(MemoryEdgeCache::new(16)));
        service.store_blob(text(b"hello")).await.unwrap();
        let reads_after_write = store.reads.load(Ordering::SeqCst);

        for _ in 0..3 {
            let blob = service.fetch_blob("2cf24db").await.unwrap();
            assert_eq!(blob.body, Bytes::from_static(b"hello"));
        }
        assert_eq!(store.reads.load(Ordering::SeqCst), reads_after_write + 1);
    }

    #[tokio::test]
    async fn not_found_is_not_cached() {
        let store = Arc::new(CountingStore::default());
        let cache = Arc::new(MemoryEdgeCache::new(16));
        let service = BlobService::new(store.clone()).with_cache(cache.clone());

        assert!(service.fetch_blob("2cf24db").await.is_err());
        assert!(cache.is_empty());

        service.store_blob(text(b"hello")).await.unwrap();
        assert!(service.fetch_blob("2cf24db").await.is_ok());
    }

    #[tokio::test]
    async fn gzip_at_rest_roundtrip() {
        let store = Arc::new(InMemoryBlobStore::new());
        let service = BlobService::new(store.clone()).with_encoding(ContentEncoding::Gzip);
        let stored = service.store_blob(text(b"hello")).await.unwrap();
        // The digest covers the raw bytes, not the compressed ones.
        assert_eq!(stored.identifier.as_str(), "2cf24db");

        let fetched = service.fetch_blob("2cf24db").await.unwrap();
        assert_eq!(fetched.encoding, ContentEncoding::Gzip);
        assert_eq!(&fetched.body[..2], &[0x1f, 0x8b]);
        let raw = encoding::decode(ContentEncoding::Gzip, &fetched.body).unwrap();
        assert_eq!(raw, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn tampered_entry_is_corrupt() {
        let store = Arc::new(InMemoryBlobStore::new());
        let id = Identifier::parse("2cf24db").unwrap();
        let meta = BlobMetadata::new(ContentHasher::hash(b"hello"), "text/plain");
        store.put(&id, Bytes::from_static(b"HELLO"), &meta).await.unwrap();

        let verifying = BlobService::new(store.clone());
        let err = verifying.fetch_blob("2cf24db").await.unwrap_err();
        assert!(matches!(err, ServerError::CorruptEntry { .. }));

        let trusting = BlobService::new(store).with_verify_on_read(false);
        assert!(trusting.fetch_blob("2cf24db").await.is_ok());
    }

    #[tokio::test]
    async fn from_config_wires_options() {
        let mut config = ServerConfig::default();
        config.storage.compress = true;
        config.collision_policy = CollisionPolicy::Overwrite;
        let service = BlobService::from_config(Arc::new(InMemoryBlobStore::new()), &config);
        assert_eq!(service.policy(), CollisionPolicy::Overwrite);
        let debug = format!("{service:?}");
        assert!(debug.contains("Gzip"));
        assert!(debug.contains("cache: true"));
    }
}
