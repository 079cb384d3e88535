//! Tagged payload encoding for cached values.
//!
//! Byte 0 names the encoding, the rest is the body:
//! - `t`: JSON text. Used for every value JSON can represent, scalars and
//!   structured values alike, so other processes reading the same keyspace can
//!   decode them and self-describing types (`serde_json::Value`, skipped
//!   optional fields, untagged enums) read back intact.
//! - `b`: bincode, only for values JSON rejects (maps keyed by tuples or other
//!   non-scalar keys).
//!
//! Decoding dispatches on the tag; it never guesses.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

const TEXT_TAG: u8 = b't';
const BINARY_TAG: u8 = b'b';

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("empty payload")]
    Empty,

    #[error("unknown payload tag 0x{0:02x}")]
    UnknownTag(u8),

    #[error("text payload: {0}")]
    Text(#[from] serde_json::Error),

    #[error("binary payload: {0}")]
    Binary(#[from] bincode::Error),
}

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    let mut out = vec![TEXT_TAG];
    if serde_json::to_writer(&mut out, value).is_ok() {
        return Ok(out);
    }

    let mut out = vec![BINARY_TAG];
    bincode::serialize_into(&mut out, value)?;
    Ok(out)
}

pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, CodecError> {
    match payload.split_first() {
        Some((&TEXT_TAG, body)) => Ok(serde_json::from_slice(body)?),
        Some((&BINARY_TAG, body)) => Ok(bincode::deserialize(body)?),
        Some((&tag, _)) => Err(CodecError::UnknownTag(tag)),
        None => Err(CodecError::Empty),
    }
}
