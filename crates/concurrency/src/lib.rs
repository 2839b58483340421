//! Concurrency layer for the raw key-value store
//!
//! This crate implements optimistic concurrency control (OCC) with:
//! - TransactionContext: staged ops plus a read-your-writes overlay
//! - Commit-time validation by replaying staged ops through the sequence oracle
//! - TransactionManager: commit lock, version allocation, WAL append, apply

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod manager;
pub mod transaction;
pub mod validation;

pub use manager::{CommitInfo, CommitOptions, TransactionManager, TransactionMetrics};
pub use transaction::{PendingOperations, TransactionContext, TransactionStatus};
pub use validation::{apply_op, validate, KeyImage, StagedOp};

// Cancellation token accepted by CommitOptions
pub use tokio_util::sync::CancellationToken;
