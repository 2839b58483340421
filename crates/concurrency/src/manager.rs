//! Transaction manager for coordinating commit operations
//!
//! Provides atomic commit by orchestrating:
//! 1. Validation (staged ops replayed against committed state)
//! 2. WAL writing (durability)
//! 3. Storage application (visibility)
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. Check cancellation, acquire commit lock (optionally with timeout)
//! 2. Re-check cancellation
//! 3. validate() - replay staged ops; first failure aborts the transaction
//! 4. Allocate commit_version (increment global version)
//! 5. Append BeginTxn, mutations, CommitTxn to WAL (DURABILITY POINT)
//! 6. apply() to the record set - single atomic visibility step
//! 7. mark_committed(), return CommitInfo
//! ```
//!
//! If a crash occurs before step 5 completes: the transaction is not durable
//! and is discarded on recovery. After step 5: it is replayed on recovery.
//! Cancellation and timeouts are only honoured before step 3.

use crate::transaction::TransactionContext;
use chrono::Utc;
use parking_lot::Mutex;
use rawkv_core::{Result, StoreError};
use rawkv_durability::Wal;
use rawkv_storage::RecordStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Options for a single commit
#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    /// Give up if the commit lock is not acquired within this time
    pub timeout: Option<Duration>,
    /// Abandon the commit if cancelled before validation starts
    pub cancellation: Option<CancellationToken>,
}

impl CommitOptions {
    /// Options with no timeout and no cancellation
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the lock-acquisition timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .map_or(false, CancellationToken::is_cancelled)
    }
}

/// Milliseconds in `d`, saturating at `u64::MAX`
fn whole_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Result of a successful commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitInfo {
    /// Transaction identifier
    pub txn_id: u64,
    /// Global commit version (unchanged for transactions with nothing to write)
    pub commit_version: u64,
    /// Number of resolved mutations applied
    pub mutations: usize,
}

/// Snapshot of transaction counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransactionMetrics {
    /// Transactions begun
    pub started: u64,
    /// Transactions committed
    pub committed: u64,
    /// Transactions aborted (explicitly, by drop, or by failed commit)
    pub aborted: u64,
    /// Commits rejected by validation
    pub validation_failures: u64,
    /// Transactions neither committed nor aborted
    pub active: u64,
    /// committed / (committed + aborted), or 0 when nothing has finished
    pub commit_rate: f64,
}

/// Manages transaction lifecycle and atomic commits
///
/// TransactionManager coordinates the commit protocol:
/// - Validation against current record set state
/// - WAL writing for durability
/// - Record set application for visibility
///
/// Global version counter is incremented once per transaction that writes.
/// All mutations in a transaction share the same commit version.
///
/// # Thread Safety
///
/// The commit operation is serialized via an internal lock to prevent TOCTOU
/// races between validation and application. The same lock owns the WAL, so
/// log order always matches commit-version order.
pub struct TransactionManager {
    /// Global version counter
    ///
    /// Monotonically increasing. Each committed writeset increments by 1.
    version: AtomicU64,

    /// Next transaction ID
    ///
    /// Unique identifier for transactions. Used in WAL entries.
    next_txn_id: AtomicU64,

    /// Commit serialization lock, guarding the WAL (None when ephemeral)
    commit_lock: Mutex<Option<Wal>>,

    started: AtomicU64,
    committed: AtomicU64,
    aborted: AtomicU64,
    validation_failures: AtomicU64,
}

impl TransactionManager {
    /// Create a new transaction manager
    ///
    /// # Arguments
    /// * `initial_version` - Starting version (typically from recovery's final_version)
    pub fn new(initial_version: u64) -> Self {
        Self::with_txn_id(initial_version, 0)
    }

    /// Create a new transaction manager with specific starting txn_id
    ///
    /// Used after recovery so new transactions get ids that don't collide
    /// with transactions already in the WAL.
    ///
    /// # Arguments
    /// * `initial_version` - Starting version (from recovery's final_version)
    /// * `max_txn_id` - Maximum txn_id seen in WAL (new transactions start at max_txn_id + 1)
    pub fn with_txn_id(initial_version: u64, max_txn_id: u64) -> Self {
        TransactionManager {
            version: AtomicU64::new(initial_version),
            next_txn_id: AtomicU64::new(max_txn_id + 1),
            commit_lock: Mutex::new(None),
            started: AtomicU64::new(0),
            committed: AtomicU64::new(0),
            aborted: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
        }
    }

    /// Attach a WAL; commits append to it before becoming visible
    pub fn with_wal(mut self, wal: Wal) -> Self {
        *self.commit_lock.get_mut() = Some(wal);
        self
    }

    /// Check if commits are logged
    pub fn is_durable(&self) -> bool {
        self.commit_lock.lock().is_some()
    }

    /// Get current global version
    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn next_txn_id(&self) -> u64 {
        self.next_txn_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Allocate next commit version (increment global version)
    ///
    /// # Version Gaps
    ///
    /// A WAL write failure after allocation leaves a gap. Consumers should
    /// not assume version numbers are contiguous.
    fn allocate_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Begin a transaction
    pub fn begin(&self) -> TransactionContext {
        let txn_id = self.next_txn_id();
        self.started.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(txn_id, "transaction started");
        TransactionContext::new(txn_id)
    }

    /// Commit a transaction atomically
    ///
    /// # Arguments
    /// * `txn` - Transaction to commit (must be Active)
    /// * `store` - Record set to validate against and apply to
    /// * `options` - Timeout and cancellation
    ///
    /// # Returns
    /// - `Ok(CommitInfo)` on success
    /// - `TransactionAlreadyCompleted` if `txn` is not active
    /// - `DuplicateKey` / `KeyNotFound` / `VersionConflict` from validation
    /// - `CommitTimeout` / `Cancelled` before validation
    /// - `Io` / `Corruption` if the WAL append fails
    ///
    /// On any error other than `TransactionAlreadyCompleted` the transaction
    /// is aborted and the record set is unchanged.
    pub fn commit(
        &self,
        txn: &mut TransactionContext,
        store: &RecordStore,
        options: &CommitOptions,
    ) -> Result<CommitInfo> {
        txn.ensure_active()?;
        let txn_id = txn.txn_id();

        if txn.is_read_only() {
            let commit_version = self.current_version();
            txn.mark_committed(commit_version)?;
            self.committed.fetch_add(1, Ordering::Relaxed);
            return Ok(CommitInfo {
                txn_id,
                commit_version,
                mutations: 0,
            });
        }

        if options.is_cancelled() {
            return Err(self.fail(txn, StoreError::Cancelled));
        }

        let mut wal = match options.timeout {
            Some(timeout) => match self.commit_lock.try_lock_for(timeout) {
                Some(guard) => guard,
                None => {
                    let err = StoreError::CommitTimeout {
                        timeout_ms: whole_millis(timeout),
                    };
                    return Err(self.fail(txn, err));
                }
            },
            None => self.commit_lock.lock(),
        };

        if options.is_cancelled() {
            return Err(self.fail(txn, StoreError::Cancelled));
        }

        let writeset = match txn.validate(store) {
            Ok(writeset) => writeset,
            Err(e) => {
                self.validation_failures.fetch_add(1, Ordering::Relaxed);
                return Err(self.fail(txn, e));
            }
        };

        if writeset.is_empty() {
            let commit_version = self.current_version();
            txn.mark_committed(commit_version)?;
            self.committed.fetch_add(1, Ordering::Relaxed);
            return Ok(CommitInfo {
                txn_id,
                commit_version,
                mutations: 0,
            });
        }

        let commit_version = self.allocate_version();
        let timestamp_ms = Utc::now().timestamp_millis();

        if let Some(wal) = wal.as_mut() {
            if let Err(e) = wal.append_transaction(txn_id, commit_version, timestamp_ms, &writeset) {
                tracing::error!(txn_id, commit_version, error = %e, "WAL append failed");
                return Err(self.fail(txn, e.into()));
            }
        }

        // DURABILITY POINT: from here on the transaction is replayed on recovery

        store.apply(&writeset, commit_version, timestamp_ms);
        drop(wal);

        txn.mark_committed(commit_version)?;
        self.committed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(txn_id, commit_version, mutations = writeset.len(), "committed");

        Ok(CommitInfo {
            txn_id,
            commit_version,
            mutations: writeset.len(),
        })
    }

    fn fail(&self, txn: &mut TransactionContext, err: StoreError) -> StoreError {
        if txn.mark_aborted(format!("commit failed: {}", err)).is_ok() {
            self.aborted.fetch_add(1, Ordering::Relaxed);
        }
        err
    }

    /// Explicitly abort a transaction
    ///
    /// A no-op for transactions that already committed or aborted. Returns
    /// whether this call aborted it.
    pub fn abort(&self, txn: &mut TransactionContext, reason: impl Into<String>) -> bool {
        if !txn.is_active() {
            return false;
        }
        let aborted = txn.mark_aborted(reason.into()).is_ok();
        if aborted {
            self.aborted.fetch_add(1, Ordering::Relaxed);
        }
        aborted
    }

    /// Force buffered WAL appends to disk
    pub fn flush(&self) -> Result<()> {
        if let Some(wal) = self.commit_lock.lock().as_mut() {
            wal.sync()?;
        }
        Ok(())
    }

    /// Snapshot of transaction counters
    pub fn metrics(&self) -> TransactionMetrics {
        let started = self.started.load(Ordering::Relaxed);
        let committed = self.committed.load(Ordering::Relaxed);
        let aborted = self.aborted.load(Ordering::Relaxed);
        let finished = committed + aborted;
        TransactionMetrics {
            started,
            committed,
            aborted,
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            active: started.saturating_sub(finished),
            commit_rate: if finished == 0 {
                0.0
            } else {
                committed as f64 / finished as f64
            },
        }
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new(0)
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager")
            .field("version", &self.current_version())
            .field("next_txn_id", &self.next_txn_id.load(Ordering::Relaxed))
            .finish()
    }
}
