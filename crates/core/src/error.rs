//! Error taxonomy for store operations
//!
//! Every operation surfaces failures through the closed [`StoreError`] enum.
//! Nothing is retried internally; retry policy belongs to the caller.
//!
//! ## Error Codes (Canonical)
//!
//! | Code | Description |
//! |------|-------------|
//! | DuplicateKey | Add on a key that already has a record |
//! | KeyNotFound | Remove or update on an absent key |
//! | VersionConflict | Expected sequence number does not match the current one |
//! | InvalidOperation | Persistence path not allowed for this entity or handle |
//! | TransactionAlreadyCompleted | Operation on a committed or aborted transaction |
//! | CommitTimeout | Commit lock not acquired within the requested timeout |
//! | Cancelled | Commit cancelled before its durability point |
//! | Corruption | Persisted bytes could not be decoded |
//! | Serialization | Value could not be (de)serialized |
//! | InvalidConfig | Configuration rejected |
//! | Io | Underlying file I/O failure |

use crate::types::SequenceNumber;
use thiserror::Error;

/// All store failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// `add` on a key that already has a record
    #[error("duplicate key: {key}")]
    DuplicateKey {
        /// The key that already exists
        key: String,
    },

    /// `remove` or `update` on a key without a record
    #[error("key not found: {key}")]
    KeyNotFound {
        /// The missing key
        key: String,
    },

    /// Expected sequence number is stale
    #[error("version conflict on {key}: expected sequence {expected}, current {actual}")]
    VersionConflict {
        /// Key whose record moved on
        key: String,
        /// Sequence number the caller expected
        expected: SequenceNumber,
        /// Sequence number currently stored
        actual: SequenceNumber,
    },

    /// Operation not allowed in the current mode
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Operation on a transaction that is already committed or aborted
    #[error("transaction {txn_id} already completed ({state})")]
    TransactionAlreadyCompleted {
        /// Transaction identifier
        txn_id: u64,
        /// Terminal state name
        state: &'static str,
    },

    /// Commit lock not acquired in time
    #[error("commit timed out after {timeout_ms}ms")]
    CommitTimeout {
        /// Requested timeout
        timeout_ms: u64,
    },

    /// Commit cancelled before reaching the durability point
    #[error("commit cancelled")]
    Cancelled,

    /// Persisted bytes could not be decoded
    #[error("corruption: {0}")]
    Corruption(String),

    /// Value (de)serialization failure
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration rejected
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Get the canonical error code
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::DuplicateKey { .. } => "DuplicateKey",
            StoreError::KeyNotFound { .. } => "KeyNotFound",
            StoreError::VersionConflict { .. } => "VersionConflict",
            StoreError::InvalidOperation(_) => "InvalidOperation",
            StoreError::TransactionAlreadyCompleted { .. } => "TransactionAlreadyCompleted",
            StoreError::CommitTimeout { .. } => "CommitTimeout",
            StoreError::Cancelled => "Cancelled",
            StoreError::Corruption(_) => "Corruption",
            StoreError::Serialization(_) => "Serialization",
            StoreError::InvalidConfig(_) => "InvalidConfig",
            StoreError::Io(_) => "Io",
        }
    }

    /// Check if this error is retryable
    ///
    /// A version conflict means the caller should re-read the current
    /// sequence number and retry with fresh data.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }

    /// Check if this is a key-not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::KeyNotFound { .. })
    }

    /// Check if this is a duplicate-key error
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { .. })
    }

    /// Check if this is a version conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }

    /// Create a duplicate-key error
    pub fn duplicate(key: &str) -> Self {
        StoreError::DuplicateKey {
            key: key.to_owned(),
        }
    }

    /// Create a key-not-found error
    pub fn not_found(key: &str) -> Self {
        StoreError::KeyNotFound {
            key: key.to_owned(),
        }
    }

    /// Create a version-conflict error
    pub fn conflict(key: &str, expected: SequenceNumber, actual: SequenceNumber) -> Self {
        StoreError::VersionConflict {
            key: key.to_owned(),
            expected,
            actual,
        }
    }
}
