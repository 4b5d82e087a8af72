use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use kvdrop_types::{BlobMetadata, Identifier};

use crate::entry::StoredEntry;
use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;

/// A record as a key-value service holds it: bytes plus untyped metadata.
#[derive(Clone)]
struct RawRecord {
    body: Bytes,
    metadata: Value,
}

/// In-memory, map-based blob store.
///
/// Intended for the development server and tests. Metadata is kept as raw
/// JSON, the way a key-value service would hold it, and validated on the
/// way out. Reads observe writes immediately.
pub struct InMemoryBlobStore {
    records: RwLock<BTreeMap<Identifier, RawRecord>>,
}

impl InMemoryBlobStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.records.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().expect("lock poisoned").is_empty()
    }

    /// Total stored bytes across all entries.
    pub fn total_bytes(&self) -> u64 {
        self.records
            .read()
            .expect("lock poisoned")
            .values()
            .map(|record| record.body.len() as u64)
            .sum()
    }

    /// Store a record with arbitrary metadata, bypassing the typed API.
    ///
    /// Lets callers reproduce records written by other clients of the same
    /// key-value namespace.
    pub fn insert_raw(&self, id: Identifier, body: impl Into<Bytes>, metadata: Value) {
        let record = RawRecord {
            body: body.into(),
            metadata,
        };
        self.records.write().expect("lock poisoned").insert(id, record);
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, id: &Identifier, body: Bytes, metadata: &BlobMetadata) -> StoreResult<()> {
        let record = RawRecord {
            body,
            metadata: metadata.to_wire(),
        };
        self.records
            .write()
            .expect("lock poisoned")
            .insert(id.clone(), record);
        Ok(())
    }

    async fn get_with_metadata(&self, id: &Identifier) -> StoreResult<Option<StoredEntry>> {
        let record = match self.records.read().expect("lock poisoned").get(id) {
            Some(record) => record.clone(),
            None => return Ok(None),
        };
        let metadata =
            BlobMetadata::from_wire(&record.metadata).map_err(|e| StoreError::CorruptEntry {
                id: id.clone(),
                reason: e.to_string(),
            })?;
        Ok(Some(StoredEntry::new(record.body, metadata)))
    }

    async fn list(&self, prefix: Option<&str>) -> StoreResult<Vec<Identifier>> {
        let map = self.records.read().expect("lock poisoned");
        let prefix = prefix.unwrap_or("");
        Ok(map
            .keys()
            .filter(|id| id.as_str().starts_with(prefix))
            .cloned()
            .collect())
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("entry_count", &self.len())
            .finish()
    }
}
