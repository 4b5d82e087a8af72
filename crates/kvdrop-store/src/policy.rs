//! What happens when a write lands on an identifier that is already taken.
//!
//! Seven hex characters leave room for only 2^28 identifiers, so two
//! unrelated blobs will eventually share one. A plain `put` would silently
//! replace the first blob with the second. [`CollisionPolicy`] makes the
//! choice explicit and [`CollisionPolicy::apply`] is the only write path that
//! consults it.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use kvdrop_types::{BlobMetadata, Digest, Identifier};

use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;

/// Policy applied when storing a blob under an identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Look up the identifier first. Nothing there: write. The same digest
    /// there: skip the write, the blob is already stored. A different digest
    /// there: fail with [`StoreError::Collision`] and leave the store alone.
    #[default]
    Reject,
    /// Write unconditionally without looking. A colliding blob replaces the
    /// earlier one, which then becomes unreachable.
    Overwrite,
}

/// What a write should do, given what is already stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteDecision {
    Write,
    Skip,
}

/// Result of [`CollisionPolicy::apply`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The blob was handed to the backing store.
    Written,
    /// The identical blob was already stored; nothing was written.
    AlreadyPresent,
}

impl CollisionPolicy {
    /// Whether [`decide`](Self::decide) needs the existing entry's metadata.
    pub fn requires_lookup(&self) -> bool {
        matches!(self, Self::Reject)
    }

    /// Decide whether to write `incoming` under `id` given what is stored.
    pub fn decide(
        &self,
        id: &Identifier,
        existing: Option<&BlobMetadata>,
        incoming: &Digest,
    ) -> StoreResult<WriteDecision> {
        match (self, existing) {
            (Self::Overwrite, _) | (Self::Reject, None) => Ok(WriteDecision::Write),
            (Self::Reject, Some(meta)) if meta.digest == *incoming => Ok(WriteDecision::Skip),
            (Self::Reject, Some(meta)) => Err(StoreError::Collision {
                id: id.clone(),
                existing: meta.digest,
                incoming: *incoming,
            }),
        }
    }

    /// Store `body` under `id` as this policy allows.
    ///
    /// The lookup and the put are two separate store calls; the contract
    /// offers no compare-and-swap. Two concurrent first writes of different
    /// blobs with the same identifier can both pass the lookup, and the later
    /// put wins.
    pub async fn apply(
        &self,
        store: &dyn BlobStore,
        id: &Identifier,
        body: Bytes,
        metadata: &BlobMetadata,
    ) -> StoreResult<WriteOutcome> {
        let existing = if self.requires_lookup() {
            match store.get_metadata(id).await {
                Ok(meta) => meta,
                // An unreadable record cannot be the same blob; treat it as
                // occupied by something else.
                Err(StoreError::CorruptEntry { reason, .. }) => {
                    warn!(%id, %reason, "existing entry is corrupt; refusing to overwrite");
                    return Err(StoreError::CorruptEntry {
                        id: id.clone(),
                        reason,
                    });
                }
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        match self.decide(id, existing.as_ref(), &metadata.digest) {
            Ok(WriteDecision::Skip) => {
                debug!(%id, "identical blob already stored; skipping write");
                Ok(WriteOutcome::AlreadyPresent)
            }
            Ok(WriteDecision::Write) => {
                store.put(id, body, metadata).await?;
                Ok(WriteOutcome::Written)
            }
            Err(e) => {
                warn!(%id, error = %e, "identifier collision rejected");
                Err(e)
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::Overwrite => "overwrite",
        }
    }
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reject" => Ok(Self::Reject),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(format!(
                "unknown collision policy {other:?} (expected \"reject\" or \"overwrite\")"
            )),
        }
    }
}
