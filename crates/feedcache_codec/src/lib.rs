//! # feedcache Codec
//!
//! Record model and CBOR encoding for feedcache.
//!
//! The record store keeps records and change events as CBOR documents.
//! This crate owns both shapes and the functions that turn bytes into
//! typed values, so that every decode failure surfaces as a [`CodecError`]
//! the cache can route to its decode-error handler.
//!
//! ## Usage
//!
//! ```
//! use feedcache_codec::{decode_record, encode_record, Category, Record};
//!
//! let record = Record::new(1, "Alice", Category::A, 9_001_234_567);
//! let bytes = encode_record(&record).unwrap();
//! assert_eq!(decode_record(&bytes).unwrap(), record);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod change;
mod error;
mod record;

pub use cbor::{decode_change, decode_record, encode_change, encode_record, from_cbor, to_cbor};
pub use change::{ChangeEvent, OperationType};
pub use error::{CodecError, CodecResult};
pub use record::{Category, Record, RecordId};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record_strategy() -> impl Strategy<Value = Record> {
        (
            any::<i64>(),
            "[A-Za-z ]{0,24}",
            prop_oneof![Just(Category::A), Just(Category::B)],
            any::<i64>(),
        )
            .prop_map(|(id, name, category, number)| Record::new(id, name, category, number))
    }

    proptest! {
        #[test]
        fn records_survive_encoding(record in record_strategy()) {
            let bytes = encode_record(&record).unwrap();
            prop_assert_eq!(decode_record(&bytes).unwrap(), record);
        }

        #[test]
        fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
            let _ = decode_record(&bytes);
            let _ = decode_change(&bytes);
        }
    }
}
