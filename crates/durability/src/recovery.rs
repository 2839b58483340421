//! Crash recovery by WAL replay
//!
//! ## Key Principle
//!
//! After recovery the record set corresponds to a **prefix of the committed
//! transaction history**. No partial transaction is ever replayed.
//!
//! ## Recovery Sequence
//!
//! 1. Decode frames from the start of the log
//! 2. Group entries between BeginTxn and CommitTxn
//! 3. Stop at a torn tail: an incomplete frame, or a damaged final frame
//! 4. Truncate the file after the last CommitTxn so new appends never follow
//!    garbage or an orphaned transaction
//!
//! A damaged frame with more log after it is corruption, not a torn write.
//! Recovery fails with the decode error and leaves the file untouched.

use crate::encoding::{decode_entry, frame_size, WalError};
use crate::wal::WalEntry;
use rawkv_storage::Writeset;
use std::fs::OpenOptions;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// A transaction found complete in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredTransaction {
    /// Transaction identifier
    pub txn_id: u64,
    /// Global commit version
    pub commit_version: u64,
    /// Commit timestamp (Unix milliseconds)
    pub timestamp_ms: i64,
    /// Mutations in application order
    pub writeset: Writeset,
}

/// Outcome of replaying a log
#[derive(Debug, Default, Clone)]
pub struct RecoveryResult {
    /// Committed transactions in log order
    pub transactions: Vec<RecoveredTransaction>,
    /// Frames decoded successfully
    pub entries_read: u64,
    /// Transactions without a CommitTxn (discarded)
    pub orphaned_transactions: u64,
    /// Bytes removed from the end of the log
    pub truncated_bytes: u64,
    /// Highest transaction id seen
    pub max_txn_id: u64,
    /// Highest commit version recovered
    pub final_version: u64,
    /// Total recovery time (microseconds)
    pub recovery_time_micros: u64,
}

impl RecoveryResult {
    /// Get human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Recovery complete: {} transactions, {} WAL entries, {} orphaned, {} bytes truncated, {:.2}ms",
            self.transactions.len(),
            self.entries_read,
            self.orphaned_transactions,
            self.truncated_bytes,
            self.recovery_time_micros as f64 / 1000.0,
        )
    }

    /// Check if recovery had to discard anything
    pub fn has_issues(&self) -> bool {
        self.orphaned_transactions > 0 || self.truncated_bytes > 0
    }
}

struct OpenTxn {
    txn_id: u64,
    timestamp_ms: i64,
    writeset: Writeset,
}

/// Replay the log at `path`
///
/// A missing file is an empty log. The file is truncated after the last
/// committed transaction.
///
/// # Errors
/// Any decode error other than a torn tail, before the file is modified.
pub fn recover(path: &Path) -> Result<RecoveryResult, WalError> {
    let started = Instant::now();
    let mut result = RecoveryResult::default();

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no WAL to recover");
            return Ok(result);
        }
        Err(e) => return Err(e.into()),
    };

    let mut offset = 0usize;
    let mut committed_end = 0usize;
    let mut open: Option<OpenTxn> = None;

    while offset < bytes.len() {
        let (entry, used) = match decode_entry(&bytes[offset..], offset as u64) {
            Ok(decoded) => decoded,
            Err(e @ WalError::Incomplete { .. }) => {
                warn!(error = %e, "stopping WAL replay at torn frame");
                break;
            }
            Err(e) => {
                let end = frame_size(&bytes[offset..]).map(|size| offset.saturating_add(size));
                if end.map_or(true, |end| end >= bytes.len()) {
                    warn!(error = %e, "stopping WAL replay at damaged final frame");
                    break;
                }
                error!(error = %e, offset, len = bytes.len(), "WAL corrupted before its end");
                return Err(e);
            }
        };
        offset += used;
        result.entries_read += 1;

        match entry {
            WalEntry::BeginTxn {
                txn_id,
                timestamp_ms,
            } => {
                result.max_txn_id = result.max_txn_id.max(txn_id);
                if let Some(orphan) = open.take() {
                    warn!(txn_id = orphan.txn_id, "discarding transaction without commit marker");
                    result.orphaned_transactions += 1;
                }
                open = Some(OpenTxn {
                    txn_id,
                    timestamp_ms,
                    writeset: Writeset::new(),
                });
            }
            WalEntry::CommitTxn {
                txn_id,
                commit_version,
            } => match open.take() {
                Some(txn) if txn.txn_id == txn_id => {
                    result.final_version = result.final_version.max(commit_version);
                    result.transactions.push(RecoveredTransaction {
                        txn_id,
                        commit_version,
                        timestamp_ms: txn.timestamp_ms,
                        writeset: txn.writeset,
                    });
                    committed_end = offset;
                }
                _ => {
                    warn!(txn_id, "commit marker without matching begin");
                    result.orphaned_transactions += 1;
                }
            },
            data => match open.as_mut() {
                Some(txn) => {
                    if let Some(mutation) = data.into_mutation() {
                        txn.writeset.push(mutation);
                    }
                }
                None => warn!("data entry outside a transaction"),
            },
        }
    }

    if open.is_some() {
        result.orphaned_transactions += 1;
    }

    if committed_end < bytes.len() {
        result.truncated_bytes = (bytes.len() - committed_end) as u64;
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(committed_end as u64)?;
        file.sync_all()?;
        warn!(
            truncated_bytes = result.truncated_bytes,
            "truncated WAL after last committed transaction"
        );
    }

    result.recovery_time_micros = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    info!("{}", result.summary());
    Ok(result)
}
