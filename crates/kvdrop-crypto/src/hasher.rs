use sha2::{Digest as _, Sha256};

use kvdrop_types::{Digest, Identifier};

/// SHA-256 content hasher.
///
/// The digest covers the blob's raw bytes only, with no domain tag, so it is
/// exactly what `sha256sum` prints for the same file. Use [`ContentHasher::hash`]
/// for a buffer already in memory, or feed chunks through
/// [`update`](ContentHasher::update) as they arrive.
#[derive(Clone, Default)]
pub struct ContentHasher {
    inner: Sha256,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of the blob.
    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
    }

    /// Finish hashing and return the digest.
    pub fn finalize(self) -> Digest {
        Digest::from_hash(self.inner.finalize().into())
    }

    /// Hash a complete blob.
    pub fn hash(data: &[u8]) -> Digest {
        Digest::from_hash(Sha256::digest(data).into())
    }

    /// Hash a blob and derive its public identifier in one step.
    pub fn hash_and_derive(data: &[u8]) -> (Digest, Identifier) {
        let digest = Self::hash(data);
        let id = Identifier::derive(&digest);
        (digest, id)
    }

    /// Verify that data produces the expected digest.
    pub fn verify(data: &[u8], expected: &Digest) -> bool {
        Self::hash(data) == *expected
    }
}

impl std::fmt::Debug for ContentHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentHasher").field("algorithm", &"sha256").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_digest_of_hello() {
        let (digest, id) = ContentHasher::hash_and_derive(b"hello");
        assert_eq!(
            digest.to_hex(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_eq!(id.as_str(), "2cf24db");
    }

    #[test]
    fn empty_input_is_hashed() {
        assert_eq!(
            ContentHasher::hash(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn incremental_matches_one_shot() {
        let mut hasher = ContentHasher::new();
        hasher.update(b"hel");
        hasher.update(b"");
        hasher.update(b"lo");
        assert_eq!(hasher.finalize(), ContentHasher::hash(b"hello"));
    }

    #[test]
    fn verify_correct_data() {
        let digest = ContentHasher::hash(b"test data");
        assert!(ContentHasher::verify(b"test data", &digest));
    }

    #[test]
    fn verify_incorrect_data() {
        let digest = ContentHasher::hash(b"original");
        assert!(!ContentHasher::verify(b"tampered", &digest));
    }

    proptest! {
        #[test]
        fn hash_is_deterministic(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let first = ContentHasher::hash(&data);
            let second = ContentHasher::hash(&data.clone());
            prop_assert_eq!(first, second);
            prop_assert_eq!(Identifier::derive(&first), Identifier::derive(&second));
        }

        #[test]
        fn chunking_does_not_change_digest(
            data in proptest::collection::vec(any::<u8>(), 0..2048),
            split in 0usize..2048,
        ) {
            let split = split.min(data.len());
            let mut hasher = ContentHasher::new();
            hasher.update(&data[..split]);
            hasher.update(&data[split..]);
            prop_assert_eq!(hasher.finalize(), ContentHasher::hash(&data));
        }
    }
}
