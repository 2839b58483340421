//! Raw building blocks of the store
//!
//! - [`Key`]: immutable Unicode key, compared byte-wise
//! - [`Value`]: immutable opaque bytes
//! - [`SequenceNumber`]: per-key optimistic-concurrency token

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// Key of a record
///
/// Keys are opaque to the store beyond byte-wise comparison and prefix
/// matching. Ordering is the byte order of the UTF-8 encoding, which matches
/// code point order.
///
/// `Key` implements `Borrow<str>` so maps keyed by `Key` can be queried with a
/// plain `&str`.
///
/// # Examples
///
/// ```
/// use rawkv_core::Key;
///
/// let key = Key::new("user:42");
/// assert_eq!(key.byte_len(), 7);
/// assert!(key.starts_with("user:"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key(String);

impl Key {
    /// Create a key, taking ownership of the string
    pub fn new(key: impl Into<String>) -> Self {
        Key(key.into())
    }

    /// Key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key as raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Length of the key in bytes
    pub fn byte_len(&self) -> usize {
        self.0.len()
    }

    /// Byte-prefix match
    ///
    /// Every key starts with the empty prefix, and every key starts with itself.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key(s)
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value of a record
///
/// An opaque byte sequence with explicit length. The store never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Value(Vec<u8>);

impl Value {
    /// Create a value, taking ownership of the buffer
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Value(bytes.into())
    }

    /// Value bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the value has no bytes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume into the underlying buffer
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for Value {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value(bytes.to_vec())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value(s.as_bytes().to_vec())
    }
}

/// Per-key optimistic-concurrency token
///
/// Minted when a record is created and re-minted on every successful update.
/// For a given key it strictly increases and is never reused.
/// `SequenceNumber::NONE` (zero) is never assigned to a live record.
///
/// # Examples
///
/// ```
/// use rawkv_core::SequenceNumber;
///
/// let first = SequenceNumber::NONE.next().unwrap();
/// assert_eq!(first, SequenceNumber::INITIAL);
/// assert!(first.next().unwrap() > first);
/// assert_eq!(SequenceNumber::new(u64::MAX).next(), None);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct SequenceNumber(u64);

impl SequenceNumber {
    /// Sentinel for "never assigned"
    pub const NONE: SequenceNumber = SequenceNumber(0);

    /// First number of a fresh lineage
    pub const INITIAL: SequenceNumber = SequenceNumber(1);

    /// Wrap a raw counter value
    pub const fn new(n: u64) -> Self {
        SequenceNumber(n)
    }

    /// Raw counter value
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The number following this one
    ///
    /// `None` once the counter is exhausted.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(SequenceNumber)
    }

    /// Check if this is the "never assigned" sentinel
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for SequenceNumber {
    fn from(n: u64) -> Self {
        SequenceNumber(n)
    }
}

impl std::fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
