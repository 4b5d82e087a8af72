use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::digest::Digest;
use crate::error::TypeError;

/// Number of hex characters kept from a digest to form an [`Identifier`].
pub const IDENTIFIER_LEN: usize = 7;

/// Short public identifier of a blob.
///
/// An `Identifier` is the first [`IDENTIFIER_LEN`] hex characters of the
/// blob's [`Digest`], so it carries only 28 bits. It is the key under which the
/// blob lives in the backing store and the path segment of its public URL.
///
/// Identifiers are NOT globally unique: by the birthday bound two distinct
/// blobs are more likely than not to share one once roughly nineteen thousand
/// blobs have been stored. What happens on such a clash is decided by the
/// store's collision policy, not here.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Derive the identifier of a digest (the first seven hex characters).
    pub fn derive(digest: &Digest) -> Self {
        let mut hex = digest.to_hex();
        hex.truncate(IDENTIFIER_LEN);
        Self(hex)
    }

    /// Parse an identifier supplied by a client.
    ///
    /// Accepts exactly [`IDENTIFIER_LEN`] ASCII hex characters; upper-case
    /// input is folded to lower case.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if s.len() != IDENTIFIER_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidIdentifier(s.to_string()));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if `digest` derives to this identifier.
    pub fn matches(&self, digest: &Digest) -> bool {
        digest.to_hex().starts_with(&self.0)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Identifier {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Identifier::parse(&s).map_err(serde::de::Error::custom)
    }
}
