//! Storage layer for the raw key-value store
//!
//! This crate implements the committed record set:
//! - RecordStore: BTreeMap-based storage behind a RwLock
//! - SequenceOracle: per-key sequence minting and staleness checks
//! - Writeset: resolved mutations applied atomically at commit
//!
//! The record set is only mutated through [`RecordStore::apply`], which the
//! transaction manager calls under its commit lock.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod oracle;
pub mod store;
pub mod writeset;

pub use oracle::{KeyState, LineagePolicy, SequenceOracle};
pub use store::{RecordStore, StoredRecord};
pub use writeset::{Mutation, Writeset};
