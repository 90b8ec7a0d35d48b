//! Frame codec and message validation.
//!
//! A relay frame is a self-describing binary encoding of exactly two CBOR
//! data items: a header, then a body. Decoding is a pure transform; nothing
//! here touches the sink or the cursor store.

use crate::error::{ListenerError, ListenerResult};
use ciborium::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Cursor;

/// Frame header: message type tag and operation code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayHeader {
    /// Message/collection type tag (e.g. `#commit`).
    pub t: String,
    /// Operation code.
    pub op: i64,
}

/// Frame body: the upstream sequence number plus feed-specific payload
/// fields, which are preserved untouched but not validated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayBody {
    /// Sequence number assigned by the upstream feed.
    pub seq: u64,
    /// Remaining body fields, carried through to the sink as-is.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A decoded relay message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub header: RelayHeader,
    pub body: RelayBody,
}

/// Decode a binary frame into a validated [`RelayMessage`].
///
/// The frame must contain exactly two CBOR items. Malformed CBOR fails as
/// [`ListenerError::Decode`]; a wrong item count or a schema mismatch
/// (missing or badly typed `t`, `op`, `seq`) fails as
/// [`ListenerError::Validation`]. No partially decoded message is returned.
pub fn decode_frame(raw: &[u8]) -> ListenerResult<RelayMessage> {
    let mut cursor = Cursor::new(raw);

    let header_value: Value = ciborium::from_reader(&mut cursor)
        .map_err(|e| ListenerError::Decode(e.to_string()))?;

    if cursor.position() as usize >= raw.len() {
        return Err(ListenerError::Validation(
            "frame has one data item, expected header and body".to_string(),
        ));
    }

    let body_value: Value = ciborium::from_reader(&mut cursor)
        .map_err(|e| ListenerError::Decode(e.to_string()))?;

    if (cursor.position() as usize) < raw.len() {
        return Err(ListenerError::Validation(
            "frame has trailing data after the body item".to_string(),
        ));
    }

    let header: RelayHeader = header_value
        .deserialized()
        .map_err(|e| ListenerError::Validation(format!("header: {e}")))?;

    let body: RelayBody = body_value
        .deserialized()
        .map_err(|e| ListenerError::Validation(format!("body: {e}")))?;

    Ok(RelayMessage { header, body })
}
