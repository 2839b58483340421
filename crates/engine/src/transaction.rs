//! Transaction handle
//!
//! A [`Transaction`] borrows its [`Database`] and wraps a
//! [`TransactionContext`]. Store engine calls stage work on it; `commit`
//! hands it to the transaction manager. Dropping an active transaction
//! discards everything it staged.

use crate::database::Database;
use rawkv_concurrency::{
    CommitInfo, CommitOptions, PendingOperations, StagedOp, TransactionContext, TransactionStatus,
};
use rawkv_core::Result;
use rawkv_storage::StoredRecord;

/// An open transaction on a [`Database`]
///
/// Exactly one terminal state is reached: Committed (via [`Transaction::commit`])
/// or Aborted (via [`Transaction::abort`], a failed commit, or drop). After
/// that, every operation fails with `TransactionAlreadyCompleted`.
pub struct Transaction<'db> {
    db: &'db Database,
    ctx: TransactionContext,
}

impl<'db> Transaction<'db> {
    pub(crate) fn new(db: &'db Database, ctx: TransactionContext) -> Self {
        Self { db, ctx }
    }

    /// Transaction identifier
    pub fn id(&self) -> u64 {
        self.ctx.txn_id()
    }

    /// Current status
    pub fn status(&self) -> &TransactionStatus {
        self.ctx.status()
    }

    /// Check if the transaction can still be used
    pub fn is_active(&self) -> bool {
        self.ctx.is_active()
    }

    /// Number of staged mutations
    pub fn pending(&self) -> usize {
        self.ctx.ops().len()
    }

    /// Staged mutations counted by kind
    pub fn pending_operations(&self) -> PendingOperations {
        self.ctx.pending_operations()
    }

    /// Commit with default options
    pub fn commit(&mut self) -> Result<CommitInfo> {
        self.commit_with(CommitOptions::default())
    }

    /// Commit with a lock timeout and/or cancellation token
    ///
    /// On failure the transaction is aborted and nothing it staged is visible.
    pub fn commit_with(&mut self, options: CommitOptions) -> Result<CommitInfo> {
        self.db
            .manager()
            .commit(&mut self.ctx, self.db.store(), &options)
    }

    /// Discard staged work
    ///
    /// Idempotent; a no-op after commit.
    pub fn abort(&mut self) {
        self.db.manager().abort(&mut self.ctx, "aborted by caller");
    }

    pub(crate) fn database(&self) -> &'db Database {
        self.db
    }

    pub(crate) fn stage(&mut self, op: StagedOp) -> Result<()> {
        self.ctx.stage(self.db.store(), op)
    }

    pub(crate) fn get(&self, key: &str) -> Result<Option<StoredRecord>> {
        self.ctx.get(self.db.store(), key)
    }

    pub(crate) fn scan(&self, prefix: &str) -> Result<Vec<StoredRecord>> {
        self.ctx.scan_prefix(self.db.store(), prefix)
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.db.manager().abort(&mut self.ctx, "dropped without commit") {
            tracing::debug!(txn_id = self.ctx.txn_id(), "discarded transaction on drop");
        }
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id())
            .field("status", self.status())
            .field("pending", &self.pending_operations())
            .finish()
    }
}
