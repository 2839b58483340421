//! Database: the committed record set, its transaction manager and WAL
//!
//! # Opening
//!
//! ```ignore
//! use rawkv_engine::Database;
//!
//! // Ephemeral mode for testing (no disk files, no WAL)
//! let db = Database::ephemeral();
//!
//! // Simple open with buffered durability (default)
//! let db = Database::open("/data/mydb")?;
//!
//! // Strict mode for maximum durability
//! let db = Database::builder()
//!     .path("/data/mydb")
//!     .strict()
//!     .open()?;
//! ```
//!
//! Opening a durable database replays `<path>/wal.log` before accepting
//! transactions: every committed transaction is re-applied in log order and
//! any torn or uncommitted tail is cut off.

use crate::config::DatabaseConfig;
use crate::transaction::Transaction;
use rawkv_concurrency::{TransactionManager, TransactionMetrics};
use rawkv_core::{Result, StoreError};
use rawkv_durability::{recover, DurabilityMode, Wal, WAL_FILE_NAME};
use rawkv_storage::{LineagePolicy, RecordStore};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// The raw key-value database
///
/// `Send + Sync`: share it between threads behind an `Arc`. All mutation of
/// the record set goes through transactions.
pub struct Database {
    data_dir: Option<PathBuf>,
    durability_mode: DurabilityMode,
    store: RecordStore,
    manager: TransactionManager,
    accepting: AtomicBool,
}

impl Database {
    /// Open a database at the given path with default settings
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder().path(path).open()
    }

    /// Create an ephemeral database
    ///
    /// No files, no WAL, nothing survives the process.
    pub fn ephemeral() -> Self {
        Self::assemble(
            None,
            DurabilityMode::None,
            RecordStore::new(LineagePolicy::default()),
            TransactionManager::default(),
        )
    }

    /// Create a builder for database configuration
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Open a database from a configuration
    pub fn open_with_config(config: DatabaseConfig) -> Result<Self> {
        config.validate()?;

        let path = match config.path {
            Some(path) => path,
            None => {
                return Ok(Self::assemble(
                    None,
                    DurabilityMode::None,
                    RecordStore::new(config.lineage_policy),
                    TransactionManager::default(),
                ))
            }
        };

        std::fs::create_dir_all(&path)?;
        let wal_path = path.join(WAL_FILE_NAME);

        let recovered = recover(&wal_path)?;
        if recovered.has_issues() {
            warn!(
                orphaned = recovered.orphaned_transactions,
                truncated_bytes = recovered.truncated_bytes,
                "WAL had an incomplete tail"
            );
        }

        let store = RecordStore::new(config.lineage_policy);
        for txn in &recovered.transactions {
            store.apply(&txn.writeset, txn.commit_version, txn.timestamp_ms);
        }

        let wal = Wal::open(&wal_path, config.durability)?;
        let manager = TransactionManager::with_txn_id(recovered.final_version, recovered.max_txn_id)
            .with_wal(wal);

        info!(
            path = %path.display(),
            mode = config.durability.description(),
            records = store.len(),
            version = recovered.final_version,
            "database opened"
        );

        Ok(Self::assemble(Some(path), config.durability, store, manager))
    }

    fn assemble(
        data_dir: Option<PathBuf>,
        durability_mode: DurabilityMode,
        store: RecordStore,
        manager: TransactionManager,
    ) -> Self {
        Self {
            data_dir,
            durability_mode,
            store,
            manager,
            accepting: AtomicBool::new(true),
        }
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Begin a transaction
    ///
    /// # Errors
    /// `InvalidOperation` after [`Database::shutdown`].
    pub fn begin_transaction(&self) -> Result<Transaction<'_>> {
        if !self.is_open() {
            return Err(StoreError::InvalidOperation(
                "database is shut down".to_string(),
            ));
        }
        Ok(Transaction::new(self, self.manager.begin()))
    }

    /// Run `f` in a transaction and commit it
    ///
    /// If `f` fails the transaction is aborted and its error returned.
    ///
    /// ```ignore
    /// let store = RawStore::new(db.clone());
    /// db.transaction(|txn| store.add(txn, "k", b"v"))?;
    /// ```
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T>,
    {
        let mut txn = self.begin_transaction()?;
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                txn.abort();
                Err(e)
            }
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Force buffered WAL appends to disk
    ///
    /// In batched mode the fsync interval is only checked when a commit is
    /// appended, so a database that goes idle keeps its last commits unsynced
    /// until this is called or the database is dropped.
    pub fn flush(&self) -> Result<()> {
        self.manager.flush()
    }

    /// Stop accepting new transactions and flush the WAL
    ///
    /// Transactions already begun may still commit.
    pub fn shutdown(&self) -> Result<()> {
        if self.accepting.swap(false, Ordering::SeqCst) {
            info!(version = self.version(), "database shutting down");
        }
        self.flush()
    }

    /// Check if new transactions are accepted
    pub fn is_open(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Data directory (None when ephemeral)
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Check if this is an ephemeral (no-disk) database
    pub fn is_ephemeral(&self) -> bool {
        self.data_dir.is_none()
    }

    /// Durability mode in effect
    pub fn durability_mode(&self) -> DurabilityMode {
        self.durability_mode
    }

    /// Lineage policy in effect
    pub fn lineage_policy(&self) -> LineagePolicy {
        self.store.oracle().policy()
    }

    /// Number of committed records
    pub fn record_count(&self) -> usize {
        self.store.len()
    }

    /// Commit version of the last committed writeset
    pub fn version(&self) -> u64 {
        self.manager.current_version()
    }

    /// Database metrics
    pub fn metrics(&self) -> DatabaseMetrics {
        let txn = self.manager.metrics();
        DatabaseMetrics {
            transactions_committed: txn.committed,
            transactions_aborted: txn.aborted,
            transactions_active: txn.active,
            validation_failures: txn.validation_failures,
            commit_rate: txn.commit_rate,
            operations: txn.committed + txn.aborted,
            records: self.store.len(),
        }
    }

    /// Raw transaction counters
    pub fn transaction_metrics(&self) -> TransactionMetrics {
        self.manager.metrics()
    }

    pub(crate) fn store(&self) -> &RecordStore {
        &self.store
    }

    pub(crate) fn manager(&self) -> &TransactionManager {
        &self.manager
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if let Err(e) = self.manager.flush() {
            warn!(error = %e, "failed to flush WAL on drop");
        }
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("data_dir", &self.data_dir)
            .field("durability_mode", &self.durability_mode)
            .field("store", &self.store)
            .field("manager", &self.manager)
            .finish()
    }
}

/// Database metrics
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseMetrics {
    /// Total committed transactions
    pub transactions_committed: u64,
    /// Total aborted transactions
    pub transactions_aborted: u64,
    /// Currently active transactions
    pub transactions_active: u64,
    /// Commits rejected by validation
    pub validation_failures: u64,
    /// Commit success rate (0.0 - 1.0)
    pub commit_rate: f64,
    /// Total finished transactions (commits + aborts)
    pub operations: u64,
    /// Committed records
    pub records: usize,
}

/// Builder for database configuration
///
/// ```ignore
/// // Production: disk-backed with durability
/// let db = Database::builder()
///     .path("./my-db")
///     .buffered()  // Default, good for production
///     .open()?;
///
/// // Unit testing: truly ephemeral (no disk at all)
/// let db = Database::builder().open()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct DatabaseBuilder {
    config: DatabaseConfig,
}

impl DatabaseBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn config(mut self, config: DatabaseConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the database directory path
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the durability mode
    pub fn durability(mut self, mode: DurabilityMode) -> Self {
        self.config.durability = mode;
        self
    }

    /// Write the WAL but never fsync it
    pub fn no_durability(mut self) -> Self {
        self.config.durability = DurabilityMode::None;
        self
    }

    /// Use buffered mode (default, recommended for production)
    ///
    /// Default flush interval: 100ms or 1000 commits.
    pub fn buffered(mut self) -> Self {
        self.config.durability = DurabilityMode::buffered_default();
        self
    }

    /// Use buffered mode with custom parameters
    ///
    /// # Arguments
    ///
    /// * `flush_interval_ms` - Maximum time between fsyncs
    /// * `max_pending_commits` - Maximum commits before forced fsync
    pub fn buffered_with(mut self, flush_interval_ms: u64, max_pending_commits: usize) -> Self {
        self.config.durability = DurabilityMode::Batched {
            interval_ms: flush_interval_ms,
            batch_size: max_pending_commits,
        };
        self
    }

    /// Use strict mode (fsync on every commit)
    pub fn strict(mut self) -> Self {
        self.config.durability = DurabilityMode::Strict;
        self
    }

    /// Set the lineage policy for removed keys
    pub fn lineage_policy(mut self, policy: LineagePolicy) -> Self {
        self.config.lineage_policy = policy;
        self
    }

    /// Open the database
    ///
    /// Without a path the database is ephemeral.
    pub fn open(self) -> Result<Database> {
        Database::open_with_config(self.config)
    }
}
