//! Store engine for the raw key-value store
//!
//! This crate ties the layers together:
//! - [`Database`]: record set, transaction manager, WAL and recovery
//! - [`Transaction`]: handle that stages work and commits it
//! - [`RawStore`]: add / try_add / remove / try_remove / update / try_update,
//!   point lookup and prefix enumeration
//! - [`projection`]: ready-made mappers for reads
//! - [`Entity`]: raw-vs-managed persistence boundary with a typed [`StateManager`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod database;
pub mod entity;
pub mod projection;
pub mod store;
pub mod transaction;

pub use config::{ConfigError, DatabaseConfig};
pub use database::{Database, DatabaseBuilder, DatabaseMetrics};
pub use entity::{Entity, PersistenceMode, StateManager};
pub use store::RawStore;
pub use transaction::Transaction;

// Re-export commonly used types from the lower layers
pub use rawkv_concurrency::{
    CancellationToken, CommitInfo, CommitOptions, PendingOperations, TransactionMetrics,
    TransactionStatus,
};
pub use rawkv_durability::DurabilityMode;
pub use rawkv_storage::LineagePolicy;
