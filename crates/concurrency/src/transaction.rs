//! Transaction context
//!
//! A `TransactionContext` buffers a transaction's mutations until commit:
//!
//! - `ops`: every accepted [`StagedOp`], in staging order, replayed at commit
//! - `overlay`: the resulting state of each touched key, so the transaction
//!   reads its own writes
//!
//! Nothing here touches the committed record set. Other transactions never
//! see staged work; a discarded context leaves no trace.

use crate::validation::{self, apply_op, KeyImage, StagedOp};
use rawkv_core::{Key, Result, StoreError};
use rawkv_storage::{RecordStore, StoredRecord, Writeset};
use std::collections::BTreeMap;
use std::ops::Bound;

/// Status of a transaction in its lifecycle
///
/// State transitions:
/// - `Active` → `Committed` (validation passed, writeset applied)
/// - `Active` → `Aborted` (caller abort, drop, or failed commit)
///
/// Both terminal states are final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Transaction is executing, can read and stage mutations
    Active,
    /// Transaction committed successfully
    Committed {
        /// Commit version assigned by the transaction manager
        commit_version: u64,
    },
    /// Transaction was aborted
    Aborted {
        /// Human-readable reason for abort
        reason: String,
    },
}

impl TransactionStatus {
    /// Short name for errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            TransactionStatus::Active => "active",
            TransactionStatus::Committed { .. } => "committed",
            TransactionStatus::Aborted { .. } => "aborted",
        }
    }
}

/// Counts of staged operations by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingOperations {
    /// Staged adds
    pub adds: usize,
    /// Staged removes
    pub removes: usize,
    /// Staged updates
    pub updates: usize,
}

impl PendingOperations {
    /// Total number of staged operations
    pub fn total(&self) -> usize {
        self.adds + self.removes + self.updates
    }

    /// Check if nothing is staged
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Buffered state of one transaction
#[derive(Debug)]
pub struct TransactionContext {
    txn_id: u64,
    status: TransactionStatus,
    ops: Vec<StagedOp>,
    overlay: BTreeMap<Key, KeyImage>,
}

impl TransactionContext {
    /// Create an active context
    pub fn new(txn_id: u64) -> Self {
        Self {
            txn_id,
            status: TransactionStatus::Active,
            ops: Vec::new(),
            overlay: BTreeMap::new(),
        }
    }

    // === Status ===

    /// Transaction identifier
    pub fn txn_id(&self) -> u64 {
        self.txn_id
    }

    /// Current status
    pub fn status(&self) -> &TransactionStatus {
        &self.status
    }

    /// Check if the transaction can still read and stage
    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    /// Check if the transaction committed
    pub fn is_committed(&self) -> bool {
        matches!(self.status, TransactionStatus::Committed { .. })
    }

    /// Check if the transaction was aborted
    pub fn is_aborted(&self) -> bool {
        matches!(self.status, TransactionStatus::Aborted { .. })
    }

    /// Abort reason, if aborted
    pub fn abort_reason(&self) -> Option<&str> {
        match &self.status {
            TransactionStatus::Aborted { reason } => Some(reason),
            _ => None,
        }
    }

    /// Fail with `TransactionAlreadyCompleted` unless active
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(StoreError::TransactionAlreadyCompleted {
                txn_id: self.txn_id,
                state: self.status.name(),
            })
        }
    }

    // === Staging ===

    /// Stage a mutation
    ///
    /// The op is checked against this transaction's view of its key. On
    /// failure nothing is staged and the transaction stays active.
    pub fn stage(&mut self, store: &RecordStore, op: StagedOp) -> Result<()> {
        self.ensure_active()?;

        let next = {
            let key = op.key();
            match self.overlay.get(key.as_str()) {
                Some(image) => apply_op(store.oracle(), image, &op)?,
                None => apply_op(store.oracle(), &KeyImage::from_store(store, key.as_str()), &op)?,
            }
        };

        tracing::trace!(txn_id = self.txn_id, op = op.name(), key = %op.key(), "staged");
        self.overlay.insert(op.key().clone(), next);
        self.ops.push(op);
        Ok(())
    }

    /// Staged operations in order
    pub fn ops(&self) -> &[StagedOp] {
        &self.ops
    }

    /// Check if nothing is staged
    pub fn is_read_only(&self) -> bool {
        self.ops.is_empty()
    }

    /// Counts of staged operations
    pub fn pending_operations(&self) -> PendingOperations {
        let mut pending = PendingOperations::default();
        for op in &self.ops {
            match op {
                StagedOp::Add { .. } => pending.adds += 1,
                StagedOp::Remove { .. } => pending.removes += 1,
                StagedOp::Update { .. } => pending.updates += 1,
            }
        }
        pending
    }

    // === Reads ===

    /// Read a key through the overlay
    ///
    /// Records staged by this transaction carry `last_modified_ms == 0`.
    pub fn get(&self, store: &RecordStore, key: &str) -> Result<Option<StoredRecord>> {
        self.ensure_active()?;
        match self.overlay.get_key_value(key) {
            Some((key, image)) => Ok(image.record(key).map(Self::staged)),
            None => Ok(store.get(key)),
        }
    }

    /// Every visible record whose key starts with `prefix`, sorted by key
    ///
    /// Committed records come from one consistent snapshot of the store,
    /// then this transaction's staged changes are laid over them.
    pub fn scan_prefix(&self, store: &RecordStore, prefix: &str) -> Result<Vec<StoredRecord>> {
        self.ensure_active()?;

        let snapshot = store.scan_prefix(prefix);
        if self.overlay.is_empty() {
            return Ok(snapshot);
        }

        let mut visible: BTreeMap<Key, StoredRecord> = snapshot
            .into_iter()
            .map(|stored| (stored.record.key.clone(), stored))
            .collect();

        let staged = self
            .overlay
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix));
        for (key, image) in staged {
            match image.record(key) {
                Some(record) => {
                    visible.insert(key.clone(), Self::staged(record));
                }
                None => {
                    visible.remove(key.as_str());
                }
            }
        }

        Ok(visible.into_values().collect())
    }

    fn staged(record: rawkv_core::Record) -> StoredRecord {
        StoredRecord {
            record,
            last_modified_ms: 0,
        }
    }

    // === Commit / abort ===

    /// Replay staged ops against the committed record set
    ///
    /// Call under the commit lock.
    pub fn validate(&self, store: &RecordStore) -> Result<Writeset> {
        self.ensure_active()?;
        validation::validate(store, &self.ops)
    }

    /// Transition to Committed and drop staged state
    pub fn mark_committed(&mut self, commit_version: u64) -> Result<()> {
        self.ensure_active()?;
        self.status = TransactionStatus::Committed { commit_version };
        self.clear();
        Ok(())
    }

    /// Transition to Aborted and drop staged state
    ///
    /// # Errors
    /// `TransactionAlreadyCompleted` if already committed or aborted.
    pub fn mark_aborted(&mut self, reason: String) -> Result<()> {
        self.ensure_active()?;
        tracing::debug!(
            txn_id = self.txn_id,
            discarded = self.ops.len(),
            reason = %reason,
            "transaction aborted"
        );
        self.status = TransactionStatus::Aborted { reason };
        self.clear();
        Ok(())
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.overlay.clear();
    }
}
