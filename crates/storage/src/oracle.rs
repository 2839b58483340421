//! Sequence oracle
//!
//! Mints per-key sequence numbers and detects stale expectations.
//!
//! The oracle itself is stateless: the current sequence number of a live key
//! lives in its record, and the high-water mark of a removed key lives in the
//! store's retired-lineage table. Both are summarised by [`KeyState`].

use rawkv_core::{Result, SequenceNumber, StoreError};
use serde::{Deserialize, Serialize};

/// What happens to a key's sequence lineage after it is removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineagePolicy {
    /// Re-creating a removed key continues from its last sequence number.
    ///
    /// A token held from a previous incarnation can never match again.
    #[default]
    Continue,

    /// Re-creating a removed key starts a fresh lineage at
    /// [`SequenceNumber::INITIAL`]. The removed key's high-water mark is not
    /// retained.
    Reset,
}

/// Sequence state of one key as seen by a reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyState {
    /// Sequence number of the live record, if any
    pub current: Option<SequenceNumber>,
    /// Highest sequence number ever minted for this key's retained lineage
    pub high_water: SequenceNumber,
}

impl KeyState {
    /// State of a key that was never written (or whose lineage was reset)
    pub const ABSENT: KeyState = KeyState {
        current: None,
        high_water: SequenceNumber::NONE,
    };

    /// State of a live record
    pub fn live(seq: SequenceNumber) -> Self {
        KeyState {
            current: Some(seq),
            high_water: seq,
        }
    }

    /// State of a removed key with a retained high-water mark
    pub fn retired(high_water: SequenceNumber) -> Self {
        KeyState {
            current: None,
            high_water,
        }
    }

    /// Check if a live record exists
    pub fn is_live(&self) -> bool {
        self.current.is_some()
    }
}

/// Mints and checks per-key sequence numbers
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceOracle {
    policy: LineagePolicy,
}

impl SequenceOracle {
    /// Create an oracle with the given lineage policy
    pub fn new(policy: LineagePolicy) -> Self {
        Self { policy }
    }

    /// Lineage policy in effect
    pub fn policy(&self) -> LineagePolicy {
        self.policy
    }

    /// Whether removed keys keep their high-water mark
    pub fn retains_lineage(&self) -> bool {
        self.policy == LineagePolicy::Continue
    }

    /// Sequence number for a record being created
    ///
    /// # Errors
    /// `InvalidOperation` if the key's lineage is exhausted.
    pub fn mint_created(&self, key: &str, state: &KeyState) -> Result<SequenceNumber> {
        match self.policy {
            LineagePolicy::Continue => state.high_water.next().ok_or_else(|| exhausted(key)),
            LineagePolicy::Reset => Ok(SequenceNumber::INITIAL),
        }
    }

    /// Sequence number for a record being updated
    ///
    /// # Errors
    /// `InvalidOperation` if the key's lineage is exhausted.
    pub fn mint_updated(&self, key: &str, current: SequenceNumber) -> Result<SequenceNumber> {
        current.next().ok_or_else(|| exhausted(key))
    }

    /// Compare a caller's expected sequence number with the current one
    pub fn check(&self, key: &str, expected: SequenceNumber, current: SequenceNumber) -> Result<()> {
        if expected == current {
            Ok(())
        } else {
            Err(StoreError::conflict(key, expected, current))
        }
    }
}

fn exhausted(key: &str) -> StoreError {
    StoreError::InvalidOperation(format!("sequence numbers exhausted for key '{}'", key))
}
