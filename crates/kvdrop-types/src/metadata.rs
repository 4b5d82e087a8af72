use std::fmt;

use serde_json::{Map, Value};

use crate::digest::Digest;
use crate::error::TypeError;

/// Content type recorded when an upload does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// How the bytes of a stored entry are encoded at rest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ContentEncoding {
    /// The stored bytes are the blob itself.
    #[default]
    Identity,
    /// The stored bytes are the gzip-compressed blob.
    Gzip,
}

impl ContentEncoding {
    /// Value of the `Content-Encoding` header for a response carrying the
    /// stored bytes as-is, or `None` when no header applies.
    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            Self::Identity => None,
            Self::Gzip => Some("gzip"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Gzip => "gzip",
        }
    }

    /// Parse the wire name used in stored metadata.
    pub fn from_wire(s: &str) -> Result<Self, TypeError> {
        match s {
            "identity" => Ok(Self::Identity),
            "gzip" => Ok(Self::Gzip),
            other => Err(TypeError::InvalidMetadata(format!(
                "unknown encoding {other:?}"
            ))),
        }
    }
}

impl fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata stored alongside every blob.
///
/// On the backing store this is a JSON object of the form
/// `{"shasum": "<hex>", "type": "<mime>", "encoding": "gzip"}` where
/// `encoding` is only present for non-identity encodings. Records written
/// without `encoding` read back as [`ContentEncoding::Identity`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobMetadata {
    pub digest: Digest,
    pub content_type: String,
    pub encoding: ContentEncoding,
}

impl BlobMetadata {
    pub fn new(digest: Digest, content_type: impl Into<String>) -> Self {
        Self {
            digest,
            content_type: normalize_content_type(content_type.into()),
            encoding: ContentEncoding::Identity,
        }
    }

    pub fn with_encoding(mut self, encoding: ContentEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Render the backing-store representation.
    pub fn to_wire(&self) -> Value {
        let mut map = Map::new();
        map.insert("shasum".into(), Value::String(self.digest.to_hex()));
        map.insert("type".into(), Value::String(self.content_type.clone()));
        if self.encoding != ContentEncoding::Identity {
            map.insert("encoding".into(), Value::String(self.encoding.to_string()));
        }
        Value::Object(map)
    }

    /// Validate and decode a backing-store record.
    ///
    /// The shape is checked field by field rather than trusted: `shasum` must
    /// be a full hex digest, `type` must be a string if present (empty or
    /// missing becomes [`DEFAULT_CONTENT_TYPE`]), `encoding` must be known if
    /// present. Unknown keys are ignored.
    pub fn from_wire(value: &Value) -> Result<Self, TypeError> {
        let obj = value
            .as_object()
            .ok_or_else(|| TypeError::InvalidMetadata("expected a JSON object".into()))?;

        let shasum = match obj.get("shasum") {
            Some(Value::String(s)) => s,
            Some(_) => return Err(TypeError::InvalidMetadata("shasum must be a string".into())),
            None => return Err(TypeError::InvalidMetadata("missing shasum".into())),
        };
        if shasum.len() != Digest::HEX_LEN {
            return Err(TypeError::InvalidMetadata(format!(
                "shasum must be {} hex characters, got {}",
                Digest::HEX_LEN,
                shasum.len()
            )));
        }
        let digest = Digest::from_hex(shasum)?;

        let content_type = match obj.get("type") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(_) => return Err(TypeError::InvalidMetadata("type must be a string".into())),
        };

        let encoding = match obj.get("encoding") {
            Some(Value::String(s)) => ContentEncoding::from_wire(s)?,
            Some(Value::Null) | None => ContentEncoding::Identity,
            Some(_) => {
                return Err(TypeError::InvalidMetadata("encoding must be a string".into()))
            }
        };

        Ok(Self::new(digest, content_type).with_encoding(encoding))
    }
}

fn normalize_content_type(content_type: String) -> String {
    let trimmed = content_type.trim();
    if trimmed.is_empty() {
        DEFAULT_CONTENT_TYPE.to_string()
    } else if trimmed.len() == content_type.len() {
        content_type
    } else {
        trimmed.to_string()
    }
}
