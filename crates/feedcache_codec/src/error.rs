//! Error types for the codec crate.

use crate::record::RecordId;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode value to CBOR.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode CBOR bytes.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// A non-delete change event arrived without its full document.
    #[error("{operation} event for record {key} carries no document")]
    MissingDocument {
        /// Operation name.
        operation: &'static str,
        /// Document key of the event.
        key: RecordId,
    },

    /// The full document does not belong to the event's document key.
    #[error("event key {key} does not match document id {document_id}")]
    KeyMismatch {
        /// Document key of the event.
        key: RecordId,
        /// Id found inside the full document.
        document_id: RecordId,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }
}
