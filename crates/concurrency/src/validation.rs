//! Staged operations and their replay
//!
//! Every mutation a transaction accepts is recorded as a [`StagedOp`]. The
//! same replay runs twice:
//!
//! 1. At staging time, against the transaction's own view (committed state
//!    plus earlier staged ops), to answer the caller immediately
//! 2. At commit time, against the committed record set under the commit
//!    lock, to decide whether the transaction may commit at all
//!
//! Only the second replay is authoritative. An op that held at staging time
//! but fails at commit surfaces its typed error from commit.
//!
//! Reads are never validated: a transaction that only reads always commits.

use rawkv_core::{Key, Record, Result, SequenceNumber, StoreError, Value};
use rawkv_storage::{KeyState, Mutation, RecordStore, SequenceOracle, Writeset};
use std::collections::BTreeMap;

/// A mutation accepted by a transaction but not yet committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedOp {
    /// Create a record; the key must be absent
    Add {
        /// Record key
        key: Key,
        /// Record value
        value: Value,
    },

    /// Destroy a record; the key must be present
    Remove {
        /// Record key
        key: Key,
        /// Sequence number the caller expects, if conditional
        expected: Option<SequenceNumber>,
    },

    /// Replace a record's value; the key must be present at `expected`
    Update {
        /// Record key
        key: Key,
        /// New value
        value: Value,
        /// Sequence number the caller expects
        expected: SequenceNumber,
    },
}

impl StagedOp {
    /// Key touched by this op
    pub fn key(&self) -> &Key {
        match self {
            StagedOp::Add { key, .. } | StagedOp::Remove { key, .. } | StagedOp::Update { key, .. } => {
                key
            }
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            StagedOp::Add { .. } => "add",
            StagedOp::Remove { .. } => "remove",
            StagedOp::Update { .. } => "update",
        }
    }
}

/// State of one key as replay goes along
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyImage {
    /// Sequence state
    pub state: KeyState,
    /// Value of the live record (None when absent)
    pub value: Option<Value>,
}

impl KeyImage {
    /// Image of a key in the committed record set
    pub fn from_store(store: &RecordStore, key: &str) -> Self {
        let (state, stored) = store.lookup(key);
        Self {
            state,
            value: stored.map(|s| s.record.value),
        }
    }

    /// The live record this image describes, if any
    pub fn record(&self, key: &Key) -> Option<Record> {
        match (self.state.current, &self.value) {
            (Some(sequence_number), Some(value)) => Some(Record {
                key: key.clone(),
                value: value.clone(),
                sequence_number,
            }),
            _ => None,
        }
    }
}

/// Apply one op to a key image
///
/// Returns the image after the op, or the typed precondition failure.
pub fn apply_op(oracle: &SequenceOracle, image: &KeyImage, op: &StagedOp) -> Result<KeyImage> {
    match op {
        StagedOp::Add { key, value } => {
            if image.state.is_live() {
                return Err(StoreError::duplicate(key.as_str()));
            }
            Ok(KeyImage {
                state: KeyState::live(oracle.mint_created(key.as_str(), &image.state)?),
                value: Some(value.clone()),
            })
        }
        StagedOp::Remove { key, expected } => {
            let current = image
                .state
                .current
                .ok_or_else(|| StoreError::not_found(key.as_str()))?;
            if let Some(expected) = expected {
                oracle.check(key.as_str(), *expected, current)?;
            }
            let state = if oracle.retains_lineage() {
                KeyState::retired(current)
            } else {
                KeyState::ABSENT
            };
            Ok(KeyImage { state, value: None })
        }
        StagedOp::Update {
            key,
            value,
            expected,
        } => {
            let current = image
                .state
                .current
                .ok_or_else(|| StoreError::not_found(key.as_str()))?;
            oracle.check(key.as_str(), *expected, current)?;
            Ok(KeyImage {
                state: KeyState::live(oracle.mint_updated(key.as_str(), current)?),
                value: Some(value.clone()),
            })
        }
    }
}

/// Mutation that takes a key from `base` to `last`, if any
fn resolve(key: &Key, base: &KeyImage, last: &KeyImage) -> Option<Mutation> {
    if let Some(record) = last.record(key) {
        return Some(Mutation::Put(record));
    }
    if base.state.is_live() || last.state.high_water != base.state.high_water {
        // Removed, or created and removed within the transaction: either way
        // the lineage's high-water mark must survive the commit.
        return Some(Mutation::Delete {
            key: key.clone(),
            retired: last.state.high_water.max(base.state.high_water),
        });
    }
    None
}

/// Replay `ops` against the committed record set
///
/// Must run under the commit lock so the result cannot go stale before it is
/// applied. Returns the resolved writeset (at most one mutation per key, in
/// key order), or the error of the first op whose precondition fails.
pub fn validate(store: &RecordStore, ops: &[StagedOp]) -> Result<Writeset> {
    let oracle = store.oracle();
    let mut images: BTreeMap<&Key, (KeyImage, KeyImage)> = BTreeMap::new();

    for op in ops {
        let key = op.key();
        let (_, last) = images.entry(key).or_insert_with(|| {
            let base = KeyImage::from_store(store, key.as_str());
            (base.clone(), base)
        });
        *last = apply_op(oracle, last, op)?;
    }

    Ok(images
        .into_iter()
        .filter_map(|(key, (base, last))| resolve(key, &base, &last))
        .collect::<Vec<_>>()
        .into())
}
