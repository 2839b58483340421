//! WAL (Write-Ahead Log)
//!
//! This module defines the WAL entry types and the append-only log file:
//! - BeginTxn: Start of a committed transaction, carries the commit timestamp
//! - Put: Record created or replaced
//! - Delete: Record removed, carries the retired sequence number
//! - CommitTxn: Transaction complete (DURABILITY POINT)
//!
//! Only validated writesets reach the WAL, so there is no abort entry: a
//! transaction without its CommitTxn is discarded on recovery.

use crate::encoding::{encode_entry, WalError};
use crate::mode::DurabilityMode;
use rawkv_core::{Key, Record, SequenceNumber};
use rawkv_storage::{Mutation, Writeset};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// File name of the log inside a database directory
pub const WAL_FILE_NAME: &str = "wal.log";

/// WAL entry types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalEntry {
    /// Begin transaction
    BeginTxn {
        /// Transaction identifier
        txn_id: u64,
        /// Commit timestamp (Unix milliseconds)
        timestamp_ms: i64,
    },

    /// Record created or replaced
    Put(Record),

    /// Record removed
    Delete {
        /// Key being removed
        key: Key,
        /// High-water sequence number of the removed lineage
        retired: SequenceNumber,
    },

    /// Commit transaction
    CommitTxn {
        /// Transaction identifier
        txn_id: u64,
        /// Global commit version
        commit_version: u64,
    },
}

impl WalEntry {
    /// Convert a mutation into its WAL entry
    pub fn from_mutation(mutation: &Mutation) -> Self {
        match mutation {
            Mutation::Put(record) => WalEntry::Put(record.clone()),
            Mutation::Delete { key, retired } => WalEntry::Delete {
                key: key.clone(),
                retired: *retired,
            },
        }
    }

    /// Convert a data entry back into a mutation
    ///
    /// Returns `None` for transaction boundaries.
    pub fn into_mutation(self) -> Option<Mutation> {
        match self {
            WalEntry::Put(record) => Some(Mutation::Put(record)),
            WalEntry::Delete { key, retired } => Some(Mutation::Delete { key, retired }),
            _ => None,
        }
    }
}

/// Append-only log file
///
/// Not internally synchronized: the transaction manager owns the WAL behind
/// its commit lock.
pub struct Wal {
    path: PathBuf,
    file: File,
    mode: DurabilityMode,
    /// Bytes of complete transactions in the file
    len: u64,
    /// Commits appended since the last fsync
    pending: usize,
    last_sync: Instant,
    /// Reused frame buffer
    buf: Vec<u8>,
}

impl Wal {
    /// Open (or create) the log for appending
    pub fn open(path: impl AsRef<Path>, mode: DurabilityMode) -> Result<Self, WalError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let len = file.metadata()?.len();
        tracing::debug!(path = %path.display(), ?mode, len, "opened WAL");
        Ok(Self {
            path,
            file,
            mode,
            len,
            pending: 0,
            last_sync: Instant::now(),
            buf: Vec::with_capacity(4096),
        })
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Durability mode in effect
    pub fn mode(&self) -> DurabilityMode {
        self.mode
    }

    /// Current size of the log in bytes
    pub fn size(&self) -> u64 {
        self.len
    }

    /// Append one committed transaction
    ///
    /// Writes `BeginTxn`, one entry per mutation, and `CommitTxn` in a single
    /// write, then fsyncs according to the durability mode. The transaction
    /// is durable once this returns under `Strict`. A failed write is cut
    /// back off the file so later appends never follow a partial frame.
    pub fn append_transaction(
        &mut self,
        txn_id: u64,
        commit_version: u64,
        timestamp_ms: i64,
        writeset: &Writeset,
    ) -> Result<(), WalError> {
        self.buf.clear();
        encode_entry(
            &WalEntry::BeginTxn {
                txn_id,
                timestamp_ms,
            },
            &mut self.buf,
        )?;
        for mutation in writeset {
            encode_entry(&WalEntry::from_mutation(mutation), &mut self.buf)?;
        }
        encode_entry(
            &WalEntry::CommitTxn {
                txn_id,
                commit_version,
            },
            &mut self.buf,
        )?;

        if let Err(e) = self.file.write_all(&self.buf) {
            if let Err(truncate) = self.file.set_len(self.len) {
                tracing::error!(error = %truncate, "failed to cut partial transaction from WAL");
            }
            return Err(e.into());
        }
        self.len += self.buf.len() as u64;
        self.pending += 1;

        match self.mode {
            DurabilityMode::None => {}
            DurabilityMode::Strict => self.sync()?,
            DurabilityMode::Batched {
                interval_ms,
                batch_size,
            } => {
                if self.pending >= batch_size
                    || self.last_sync.elapsed() >= Duration::from_millis(interval_ms)
                {
                    self.sync()?;
                }
            }
        }
        Ok(())
    }

    /// Force pending appends to disk
    pub fn sync(&mut self) -> Result<(), WalError> {
        self.file.flush()?;
        self.file.sync_data()?;
        self.pending = 0;
        self.last_sync = Instant::now();
        Ok(())
    }

    /// Commits appended since the last fsync
    pub fn pending(&self) -> usize {
        self.pending
    }
}

impl std::fmt::Debug for Wal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wal")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("pending", &self.pending)
            .finish()
    }
}
