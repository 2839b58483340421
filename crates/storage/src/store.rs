//! Committed record set
//!
//! BTreeMap keyed by [`Key`] behind a single `parking_lot::RwLock`.
//!
//! # Design
//!
//! - Ordered map: prefix enumeration is a range scan, not a full filter
//! - One lock for records and retired lineages: a commit's writeset becomes
//!   visible in a single write-lock section, and every read (point lookup or
//!   prefix scan) sees one consistent committed state
//! - Reads clone out of the lock: caller mappers never run while it is held
//!
//! # Thread Safety
//!
//! All methods take `&self`. Mutation only happens through [`RecordStore::apply`],
//! which the transaction manager calls under its commit lock.

use crate::oracle::{KeyState, LineagePolicy, SequenceOracle};
use crate::writeset::{Mutation, Writeset};
use parking_lot::RwLock;
use rawkv_core::{Key, Record, RecordMetadata, SequenceNumber};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};

/// A committed record plus its commit timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// The record
    pub record: Record,
    /// Commit timestamp of the last modification (Unix milliseconds)
    pub last_modified_ms: i64,
}

impl StoredRecord {
    /// Metadata view (no value bytes)
    pub fn metadata(&self) -> RecordMetadata {
        RecordMetadata {
            key: self.record.key.clone(),
            value_len: self.record.value.len(),
            sequence_number: self.record.sequence_number,
            last_modified_ms: self.last_modified_ms,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<Key, StoredRecord>,
    /// High-water sequence numbers of removed keys (Continue policy only)
    retired: FxHashMap<Key, SequenceNumber>,
}

/// The committed record set
///
/// # Example
///
/// ```ignore
/// use rawkv_storage::{RecordStore, LineagePolicy};
///
/// let store = RecordStore::new(LineagePolicy::Continue);
/// let snapshot = store.scan_prefix("user:");
/// ```
pub struct RecordStore {
    inner: RwLock<Inner>,
    oracle: SequenceOracle,
    /// Commit version of the last applied writeset
    version: AtomicU64,
}

impl RecordStore {
    /// Create an empty store
    pub fn new(policy: LineagePolicy) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            oracle: SequenceOracle::new(policy),
            version: AtomicU64::new(0),
        }
    }

    /// Sequence oracle bound to this store's lineage policy
    #[inline]
    pub fn oracle(&self) -> &SequenceOracle {
        &self.oracle
    }

    /// Commit version of the last applied writeset
    #[inline]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Check if there are no live records
    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// Number of removed keys whose lineage is retained
    pub fn retired_len(&self) -> usize {
        self.inner.read().retired.len()
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Get a committed record by exact key
    #[inline]
    pub fn get(&self, key: &str) -> Option<StoredRecord> {
        self.inner.read().records.get(key).cloned()
    }

    /// Check if a committed record exists
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().records.contains_key(key)
    }

    /// Sequence state of a key
    pub fn key_state(&self, key: &str) -> KeyState {
        let inner = self.inner.read();
        Self::state_of(&inner, key)
    }

    /// Sequence state and committed record of a key, read together
    pub fn lookup(&self, key: &str) -> (KeyState, Option<StoredRecord>) {
        let inner = self.inner.read();
        (Self::state_of(&inner, key), inner.records.get(key).cloned())
    }

    fn state_of(inner: &Inner, key: &str) -> KeyState {
        if let Some(stored) = inner.records.get(key) {
            return KeyState::live(stored.record.sequence_number);
        }
        match inner.retired.get(key) {
            Some(high_water) => KeyState::retired(*high_water),
            None => KeyState::ABSENT,
        }
    }

    /// All committed records whose key starts with `prefix`
    ///
    /// Taken under one read-lock section, so the result is a consistent
    /// snapshot: a concurrently applied writeset is either fully included or
    /// not at all. Sorted by key.
    pub fn scan_prefix(&self, prefix: &str) -> Vec<StoredRecord> {
        let inner = self.inner.read();
        inner
            .records
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(_, v)| v.clone())
            .collect()
    }

    // ========================================================================
    // Apply
    // ========================================================================

    /// Apply a resolved writeset atomically
    ///
    /// All mutations become visible together. The caller has already
    /// validated the writeset against the current state.
    ///
    /// # Arguments
    ///
    /// * `writeset` - Resolved mutations
    /// * `version` - Commit version of the transaction
    /// * `timestamp_ms` - Commit timestamp stamped on every written record
    pub fn apply(&self, writeset: &Writeset, version: u64, timestamp_ms: i64) {
        let retain = self.oracle.retains_lineage();
        let mut inner = self.inner.write();

        for mutation in writeset {
            match mutation {
                Mutation::Put(record) => {
                    inner.retired.remove(record.key.as_str());
                    inner.records.insert(
                        record.key.clone(),
                        StoredRecord {
                            record: record.clone(),
                            last_modified_ms: timestamp_ms,
                        },
                    );
                }
                Mutation::Delete { key, retired } => {
                    inner.records.remove(key.as_str());
                    if retain {
                        inner.retired.insert(key.clone(), *retired);
                    }
                }
            }
        }

        self.version.fetch_max(version, Ordering::AcqRel);
        tracing::trace!(version, mutations = writeset.len(), "applied writeset");
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(LineagePolicy::default())
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("policy", &self.oracle.policy())
            .field("version", &self.version())
            .field("records", &self.len())
            .field("retired", &self.retired_len())
            .finish()
    }
}
