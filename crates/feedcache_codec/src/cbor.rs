//! CBOR encoding of records and change events.

use crate::change::ChangeEvent;
use crate::error::{CodecError, CodecResult};
use crate::record::Record;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serializes any serde value to CBOR bytes.
pub fn to_cbor<T: Serialize>(value: &T) -> CodecResult<Vec<u8>> {
    let mut buffer = Vec::new();
    ciborium::into_writer(value, &mut buffer)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(buffer)
}

/// Deserializes a serde value from CBOR bytes.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    ciborium::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
}

/// Encodes a record as stored by the record store.
pub fn encode_record(record: &Record) -> CodecResult<Vec<u8>> {
    to_cbor(record)
}

/// Decodes a stored record.
pub fn decode_record(bytes: &[u8]) -> CodecResult<Record> {
    from_cbor(bytes)
}

/// Encodes a change event for the change feed.
pub fn encode_change(event: &ChangeEvent) -> CodecResult<Vec<u8>> {
    to_cbor(event)
}

/// Decodes and validates a change event.
///
/// # Errors
///
/// Fails on malformed CBOR, and on events whose shape is inconsistent
/// (see [`ChangeEvent::validate`]).
pub fn decode_change(bytes: &[u8]) -> CodecResult<ChangeEvent> {
    let event: ChangeEvent = from_cbor(bytes)?;
    event.validate()?;
    Ok(event)
}
