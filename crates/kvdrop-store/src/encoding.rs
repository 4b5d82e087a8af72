//! At-rest encoding of blob bodies.
//!
//! Digests always cover the raw blob. The encoding only changes the bytes
//! handed to the backing store, and is recorded in the metadata so readers
//! know what they got back.

use std::io::{Read, Write};

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use kvdrop_types::ContentEncoding;

/// Encode a raw blob for storage.
pub fn encode(encoding: ContentEncoding, raw: &Bytes) -> std::io::Result<Bytes> {
    match encoding {
        ContentEncoding::Identity => Ok(raw.clone()),
        ContentEncoding::Gzip => {
            let mut encoder =
                GzEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::default());
            encoder.write_all(raw)?;
            Ok(Bytes::from(encoder.finish()?))
        }
    }
}

/// Decode stored bytes back to the raw blob.
pub fn decode(encoding: ContentEncoding, stored: &Bytes) -> std::io::Result<Bytes> {
    match encoding {
        ContentEncoding::Identity => Ok(stored.clone()),
        ContentEncoding::Gzip => {
            let mut raw = Vec::new();
            GzDecoder::new(stored.as_ref()).read_to_end(&mut raw)?;
            Ok(Bytes::from(raw))
        }
    }
}
