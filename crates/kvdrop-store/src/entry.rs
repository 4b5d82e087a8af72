use bytes::Bytes;

use kvdrop_types::{BlobMetadata, Identifier};

use crate::encoding;
use crate::error::{StoreError, StoreResult};

/// A blob as held by the backing store: the stored bytes (possibly
/// compressed, see [`BlobMetadata::encoding`]) and their metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredEntry {
    pub body: Bytes,
    pub metadata: BlobMetadata,
}

impl StoredEntry {
    pub fn new(body: Bytes, metadata: BlobMetadata) -> Self {
        Self { body, metadata }
    }

    /// Check that this entry may be served under `id`.
    ///
    /// The metadata digest must derive to `id`. With `verify_body`, the
    /// stored bytes are also decoded and rehashed against that digest.
    pub fn verify(&self, id: &Identifier, verify_body: bool) -> StoreResult<()> {
        if !id.matches(&self.metadata.digest) {
            return Err(StoreError::CorruptEntry {
                id: id.clone(),
                reason: format!("metadata digest {} does not match key", self.metadata.digest),
            });
        }
        if verify_body {
            let raw = encoding::decode(self.metadata.encoding, &self.body).map_err(|e| {
                StoreError::CorruptEntry {
                    id: id.clone(),
                    reason: format!("cannot decode {} body: {e}", self.metadata.encoding),
                }
            })?;
            if !kvdrop_crypto::ContentHasher::verify(&raw, &self.metadata.digest) {
                return Err(StoreError::CorruptEntry {
                    id: id.clone(),
                    reason: "body does not hash to recorded digest".into(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvdrop_crypto::ContentHasher;
    use kvdrop_types::ContentEncoding;

    fn entry_for(data: &'static [u8]) -> (Identifier, StoredEntry) {
        let (digest, id) = ContentHasher::hash_and_derive(data);
        let meta = BlobMetadata::new(digest, "text/plain");
        (id, StoredEntry::new(Bytes::from_static(data), meta))
    }

    #[test]
    fn valid_entry_passes() {
        let (id, entry) = entry_for(b"hello");
        entry.verify(&id, true).unwrap();
    }

    #[test]
    fn foreign_digest_is_corrupt() {
        let (_, entry) = entry_for(b"hello");
        let other = Identifier::parse("0000000").unwrap();
        assert!(matches!(entry.verify(&other, false), Err(StoreError::CorruptEntry { .. })));
    }

    #[test]
    fn tampered_body_is_corrupt_only_when_verified() {
        let (id, mut entry) = entry_for(b"hello");
        entry.body = Bytes::from_static(b"jello");
        entry.verify(&id, false).unwrap();
        assert!(matches!(entry.verify(&id, true), Err(StoreError::CorruptEntry { .. })));
    }

    #[test]
    fn gzip_body_is_decoded_before_hashing() {
        let (id, mut entry) = entry_for(b"hello");
        entry.body = encoding::encode(ContentEncoding::Gzip, &entry.body).unwrap();
        entry.metadata.encoding = ContentEncoding::Gzip;
        entry.verify(&id, true).unwrap();
    }

    #[test]
    fn undecodable_gzip_is_corrupt() {
        let (id, mut entry) = entry_for(b"hello");
        entry.metadata.encoding = ContentEncoding::Gzip;
        assert!(matches!(entry.verify(&id, true), Err(StoreError::CorruptEntry { .. })));
    }
}
