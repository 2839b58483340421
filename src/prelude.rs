//! Convenient imports for RawKV.
//!
//! ```ignore
//! use rawkv::prelude::*;
//!
//! let db = std::sync::Arc::new(Database::ephemeral());
//! let store = RawStore::new(db.clone());
//! ```

// Main entry points
pub use crate::{Database, DatabaseBuilder, RawStore, Transaction};

// Error handling
pub use crate::{Result, StoreError};

// Core types
pub use crate::{Key, RecordMetadata, RecordView, SequenceNumber, Value};

// Reads
pub use crate::projection;

// Configuration
pub use crate::{CommitOptions, DurabilityMode, LineagePolicy};
