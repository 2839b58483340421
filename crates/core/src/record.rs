//! Records and their projections
//!
//! A [`Record`] is the persisted unit. [`RecordView`] is the borrowed form
//! handed to caller-supplied mappers, and [`Entry`] is a key/value pair that
//! has been copied out of caller buffers but not yet assigned a
//! [`SequenceNumber`].

use crate::types::{Key, SequenceNumber, Value};
use serde::{Deserialize, Serialize};

/// Owned key/value pair produced by [`crate::codec::encode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Record key
    pub key: Key,
    /// Record value
    pub value: Value,
}

impl Entry {
    /// Attach a sequence number, producing a record
    pub fn into_record(self, sequence_number: SequenceNumber) -> Record {
        Record {
            key: self.key,
            value: self.value,
            sequence_number,
        }
    }
}

/// Persisted (Key, Value, SequenceNumber) triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Record key
    pub key: Key,
    /// Record value
    pub value: Value,
    /// Optimistic-concurrency token of this version of the record
    pub sequence_number: SequenceNumber,
}

impl Record {
    /// Create a record
    pub fn new(key: impl Into<Key>, value: impl Into<Value>, sequence_number: SequenceNumber) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            sequence_number,
        }
    }

    /// Borrow as a view for projection
    pub fn view(&self) -> RecordView<'_> {
        RecordView {
            key: self.key.as_str(),
            value: self.value.as_bytes(),
            sequence_number: self.sequence_number,
        }
    }
}

/// Borrowed view of a record
///
/// Mappers receive this view; it is only valid for the duration of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordView<'a> {
    /// Record key
    pub key: &'a str,
    /// Record value bytes
    pub value: &'a [u8],
    /// Sequence number of this version
    pub sequence_number: SequenceNumber,
}

impl<'a> RecordView<'a> {
    /// Create a view over borrowed parts
    pub fn new(key: &'a str, value: &'a [u8], sequence_number: SequenceNumber) -> Self {
        Self {
            key,
            value,
            sequence_number,
        }
    }

    /// Copy into an owned record
    pub fn to_record(&self) -> Record {
        Record {
            key: Key::from(self.key),
            value: Value::from(self.value),
            sequence_number: self.sequence_number,
        }
    }
}

/// Record metadata without the value bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Record key
    pub key: Key,
    /// Length of the value in bytes
    pub value_len: usize,
    /// Current sequence number
    pub sequence_number: SequenceNumber,
    /// Commit timestamp of the last modification (Unix milliseconds, UTC)
    ///
    /// Zero for changes staged in the reading transaction and not yet committed.
    pub last_modified_ms: i64,
}
