//! Durability layer for the raw key-value store
//!
//! This crate implements write-ahead logging of committed writesets:
//! - WalEntry types: BeginTxn, Put, Delete, CommitTxn
//! - Entry framing with CRC32 checksums
//! - Durability modes: None, Strict, Batched (default)
//! - Recovery: replay committed transactions, drop torn or uncommitted tails

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encoding;
pub mod mode;
pub mod recovery;
pub mod wal;

pub use encoding::{decode_entry, encode_entry, WalError};
pub use mode::DurabilityMode;
pub use recovery::{recover, RecoveredTransaction, RecoveryResult};
pub use wal::{Wal, WalEntry, WAL_FILE_NAME};
