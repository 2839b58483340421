//! Core types for the raw key-value store
//!
//! This crate defines the data model shared by every layer:
//! - [`Key`], [`Value`], [`SequenceNumber`]: the raw building blocks
//! - [`Record`], [`RecordView`], [`RecordMetadata`]: persisted and projected records
//! - [`codec`]: conversion between borrowed views, owned records and bytes
//! - [`StoreError`]: the closed failure taxonomy surfaced to callers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod record;
pub mod types;

pub use error::{Result, StoreError};
pub use record::{Entry, Record, RecordMetadata, RecordView};
pub use types::{Key, SequenceNumber, Value};
