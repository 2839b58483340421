//! Ready-made mappers for [`crate::RawStore`] reads
//!
//! A mapper turns the borrowed [`RecordView`] handed out by `try_get` and
//! `enumerate` into an owned value. Any `FnMut(RecordView<'_>) -> T` works;
//! these cover the common shapes.
//!
//! ```ignore
//! let pairs = store.collect(&txn, "user:", projection::utf8_pair)?;
//! let keys: Vec<String> = store.enumerate(&txn, "", projection::key)?.collect();
//! ```

use rawkv_core::{Record, RecordView, Result, SequenceNumber, StoreError};
use serde::de::DeserializeOwned;

/// Owned key and value bytes
pub fn key_value(view: RecordView<'_>) -> (String, Vec<u8>) {
    (view.key.to_string(), view.value.to_vec())
}

/// Owned copy of the whole record
pub fn owned_record(view: RecordView<'_>) -> Record {
    view.to_record()
}

/// Key only
pub fn key(view: RecordView<'_>) -> String {
    view.key.to_string()
}

/// Value bytes only
pub fn value_bytes(view: RecordView<'_>) -> Vec<u8> {
    view.value.to_vec()
}

/// Sequence number only
pub fn sequence_number(view: RecordView<'_>) -> SequenceNumber {
    view.sequence_number
}

/// Key and value, the value decoded as UTF-8
///
/// # Errors
/// `Serialization` if the value is not valid UTF-8.
pub fn utf8_pair(view: RecordView<'_>) -> Result<(String, String)> {
    let value = std::str::from_utf8(view.value)
        .map_err(|e| StoreError::Serialization(format!("value of {} is not UTF-8: {}", view.key, e)))?;
    Ok((view.key.to_string(), value.to_string()))
}

/// Value decoded from MessagePack
///
/// # Errors
/// `Serialization` if the bytes do not decode as `T`.
pub fn msgpack<T: DeserializeOwned>(view: RecordView<'_>) -> Result<T> {
    rmp_serde::from_slice(view.value).map_err(|e| StoreError::Serialization(e.to_string()))
}
