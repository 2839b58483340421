//! # RawKV
//!
//! Raw transactional key-value store with per-key optimistic concurrency.
//!
//! Keys are strings, values are opaque bytes, and every record carries a
//! [`SequenceNumber`] that is minted on creation and bumped on every update.
//! All access goes through transactions; prefix enumeration reads a
//! consistent snapshot.
//!
//! ## Quick Start
//!
//! ```ignore
//! use rawkv::prelude::*;
//! use std::sync::Arc;
//!
//! let db = Arc::new(Database::open("./my-db")?);
//! let store = RawStore::new(db.clone());
//!
//! let mut txn = db.begin_transaction()?;
//! store.add(&mut txn, "user:1", b"alice")?;
//! txn.commit()?;
//!
//! let txn = db.begin_transaction()?;
//! let users = store.collect(&txn, "user:", projection::utf8_pair)?;
//! ```
//!
//! ## Crates
//!
//! - `rawkv-core`: data model, raw codec, errors
//! - `rawkv-storage`: committed record set and sequence oracle
//! - `rawkv-durability`: write-ahead log and recovery
//! - `rawkv-concurrency`: transaction context and manager
//! - `rawkv-engine`: database, raw store, projections, entities

#![warn(missing_docs)]

pub mod prelude;

// Re-export main entry points
pub use rawkv_engine::{
    projection, CancellationToken, CommitInfo, CommitOptions, ConfigError, Database,
    DatabaseBuilder, DatabaseConfig, DatabaseMetrics, DurabilityMode, Entity, LineagePolicy,
    PendingOperations, PersistenceMode, RawStore, StateManager, Transaction, TransactionMetrics,
    TransactionStatus,
};

// Re-export core types
pub use rawkv_core::{
    codec, Entry, Key, Record, RecordMetadata, RecordView, Result, SequenceNumber, StoreError,
    Value,
};
