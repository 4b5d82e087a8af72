//! Edge cache in front of the read path.
//!
//! Responses for `GET /{id}` are cacheable for seven days and marked
//! immutable: an identifier is a content hash, so the bytes behind it do not
//! change under the default collision policy. Writes never touch the cache
//! and nothing invalidates it; staleness is bounded by the freshness window
//! alone. With `collision_policy = "overwrite"` an overwritten identifier can
//! keep serving the old blob from cache until its entry expires.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use kvdrop_types::Identifier;

use crate::service::FetchedBlob;

/// Freshness policy for blob responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CachePolicy {
    pub max_age: Duration,
    pub s_maxage: Duration,
    pub immutable: bool,
}

impl CachePolicy {
    /// Seven days, shared caches included, immutable.
    pub const EDGE: Self = Self {
        max_age: Duration::from_secs(7 * 24 * 60 * 60),
        s_maxage: Duration::from_secs(7 * 24 * 60 * 60),
        immutable: true,
    };

    /// `Cache-Control` value sent with every successful blob response.
    pub fn header_value(&self) -> String {
        let mut value = format!(
            "public, max-age={}, s-maxage={}",
            self.max_age.as_secs(),
            self.s_maxage.as_secs()
        );
        if self.immutable {
            value.push_str(", immutable");
        }
        value
    }

    /// How long an edge entry stays fresh.
    pub fn freshness(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.s_maxage.as_secs() as i64)
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::EDGE
    }
}

/// Read-through cache keyed by identifier.
///
/// Only successful reads are offered to [`store`](EdgeCache::store); misses
/// and errors are never cached.
#[async_trait]
pub trait EdgeCache: Send + Sync {
    async fn lookup(&self, id: &Identifier) -> Option<FetchedBlob>;
    async fn store(&self, id: &Identifier, blob: FetchedBlob);
}

struct Slot {
    blob: FetchedBlob,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    slots: HashMap<Identifier, Slot>,
    /// Insertion order, oldest first, for eviction.
    order: VecDeque<Identifier>,
}

impl Inner {
    fn remove(&mut self, id: &Identifier) {
        self.slots.remove(id);
        self.order.retain(|queued| queued != id);
    }
}

/// Bounded in-process edge cache.
///
/// Evicts the oldest inserted entry once `max_entries` is reached and drops
/// entries older than the policy's freshness window when they are looked up.
pub struct MemoryEdgeCache {
    policy: CachePolicy,
    max_entries: usize,
    inner: Mutex<Inner>,
}

impl MemoryEdgeCache {
    pub fn new(max_entries: usize) -> Self {
        Self::with_policy(CachePolicy::EDGE, max_entries)
    }

    pub fn with_policy(policy: CachePolicy, max_entries: usize) -> Self {
        Self {
            policy,
            max_entries: max_entries.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up `id` as of `now`.
    pub fn lookup_at(&self, id: &Identifier, now: DateTime<Utc>) -> Option<FetchedBlob> {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        match inner.slots.get(id) {
            None => return None,
            Some(slot) if now < slot.expires_at => return Some(slot.blob.clone()),
            Some(_) => {}
        }
        // Stale.
        inner.remove(id);
        None
    }

    /// Insert `blob` under `id` as of `now`.
    pub fn store_at(&self, id: &Identifier, blob: FetchedBlob, now: DateTime<Utc>) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        let slot = Slot {
            blob,
            expires_at: now + self.policy.freshness(),
        };
        if inner.slots.insert(id.clone(), slot).is_some() {
            return;
        }
        inner.order.push_back(id.clone());
        while inner.slots.len() > self.max_entries {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.slots.remove(&oldest);
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl EdgeCache for MemoryEdgeCache {
    async fn lookup(&self, id: &Identifier) -> Option<FetchedBlob> {
        self.lookup_at(id, Utc::now())
    }

    async fn store(&self, id: &Identifier, blob: FetchedBlob) {
        self.store_at(id, blob, Utc::now())
    }
}

impl std::fmt::Debug for MemoryEdgeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEdgeCache")
            .field("entries", &self.len())
            .field("max_entries", &self.max_entries)
            .finish()
    }
}
