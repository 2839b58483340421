//! RawStore: the raw key-value store engine
//!
//! ## Design: STATELESS FACADE
//!
//! RawStore holds ONLY `Arc<Database>`. No caches, no maps, no locks. All
//! data lives in the database's record set; every call goes through the
//! caller's [`Transaction`].
//!
//! ## API
//!
//! - **Mutations** (staged, validated again at commit): `add`, `try_add`,
//!   `remove`, `try_remove`, `remove_if_version`, `update`, `try_update`
//! - **Reads** (see the transaction's own staged changes): `try_get`,
//!   `contains`, `try_get_metadata`, `enumerate`, `enumerate_metadata`,
//!   `collect`
//!
//! Keys and values are passed as borrowed `&str` / `&[u8]` and copied on
//! staging; the caller keeps its buffers.
//!
//! ## Try-operations
//!
//! `try_add` turns `DuplicateKey` into `false` and `try_remove` turns
//! `KeyNotFound` into `false`. Every other error is returned as is,
//! including `KeyNotFound` and `VersionConflict` from `try_update`.

use crate::database::Database;
use crate::transaction::Transaction;
use rawkv_concurrency::StagedOp;
use rawkv_core::{codec, RecordMetadata, RecordView, Result, SequenceNumber, StoreError};
use std::sync::Arc;

/// Raw transactional key-value store
///
/// Cheap to clone; clones share the same database.
#[derive(Debug, Clone)]
pub struct RawStore {
    db: Arc<Database>,
}

impl RawStore {
    /// Create a store over a database
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// The underlying database
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    fn check_owner(&self, txn: &Transaction<'_>) -> Result<()> {
        if std::ptr::eq(txn.database(), Arc::as_ptr(&self.db)) {
            Ok(())
        } else {
            Err(StoreError::InvalidOperation(
                "transaction belongs to a different database".to_string(),
            ))
        }
    }

    fn stage(&self, txn: &mut Transaction<'_>, op: StagedOp) -> Result<()> {
        self.check_owner(txn)?;
        txn.stage(op)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create a record
    ///
    /// # Errors
    /// `DuplicateKey` if the key is present.
    pub fn add(&self, txn: &mut Transaction<'_>, key: &str, value: &[u8]) -> Result<()> {
        let entry = codec::encode(key, value);
        self.stage(
            txn,
            StagedOp::Add {
                key: entry.key,
                value: entry.value,
            },
        )
    }

    /// Create a record if the key is absent
    ///
    /// Returns `false` if the key is present.
    pub fn try_add(&self, txn: &mut Transaction<'_>, key: &str, value: &[u8]) -> Result<bool> {
        absent_as_false(self.add(txn, key, value), StoreError::is_duplicate)
    }

    /// Destroy a record
    ///
    /// # Errors
    /// `KeyNotFound` if the key is absent.
    pub fn remove(&self, txn: &mut Transaction<'_>, key: &str) -> Result<()> {
        self.stage(
            txn,
            StagedOp::Remove {
                key: key.into(),
                expected: None,
            },
        )
    }

    /// Destroy a record if present
    ///
    /// Returns `false` if the key is absent.
    pub fn try_remove(&self, txn: &mut Transaction<'_>, key: &str) -> Result<bool> {
        absent_as_false(self.remove(txn, key), StoreError::is_not_found)
    }

    /// Destroy a record only at the expected sequence number
    ///
    /// # Errors
    /// `KeyNotFound` if absent, `VersionConflict` on mismatch.
    pub fn remove_if_version(
        &self,
        txn: &mut Transaction<'_>,
        key: &str,
        expected: SequenceNumber,
    ) -> Result<()> {
        self.stage(
            txn,
            StagedOp::Remove {
                key: key.into(),
                expected: Some(expected),
            },
        )
    }

    /// Replace a record's value
    ///
    /// # Errors
    /// `KeyNotFound` if absent, `VersionConflict` if `expected` is not the
    /// current sequence number.
    pub fn update(
        &self,
        txn: &mut Transaction<'_>,
        key: &str,
        value: &[u8],
        expected: SequenceNumber,
    ) -> Result<()> {
        let entry = codec::encode(key, value);
        self.stage(
            txn,
            StagedOp::Update {
                key: entry.key,
                value: entry.value,
                expected,
            },
        )
    }

    /// Replace a record's value
    ///
    /// Returns `true` once staged. Unlike the other try-operations no
    /// failure is benign here.
    ///
    /// # Errors
    /// `KeyNotFound` if absent, `VersionConflict` if `expected` is not the
    /// current sequence number.
    pub fn try_update(
        &self,
        txn: &mut Transaction<'_>,
        key: &str,
        value: &[u8],
        expected: SequenceNumber,
    ) -> Result<bool> {
        self.update(txn, key, value, expected).map(|()| true)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Exact lookup, projected through `mapper`
    pub fn try_get<T, F>(&self, txn: &Transaction<'_>, key: &str, mapper: F) -> Result<Option<T>>
    where
        F: FnOnce(RecordView<'_>) -> T,
    {
        self.check_owner(txn)?;
        Ok(txn
            .get(key)?
            .map(|stored| codec::decode(stored.record.view(), mapper)))
    }

    /// Check if a key is present
    pub fn contains(&self, txn: &Transaction<'_>, key: &str) -> Result<bool> {
        self.check_owner(txn)?;
        Ok(txn.get(key)?.is_some())
    }

    /// Exact lookup of metadata only
    pub fn try_get_metadata(&self, txn: &Transaction<'_>, key: &str) -> Result<Option<RecordMetadata>> {
        self.check_owner(txn)?;
        Ok(txn.get(key)?.map(|stored| stored.metadata()))
    }

    /// Every record whose key starts with `prefix`, projected through `mapper`
    ///
    /// An exact match of `prefix` is included. Records come from one
    /// consistent snapshot of committed state overlaid with this
    /// transaction's staged changes, in ascending key order.
    pub fn enumerate<T, F>(
        &self,
        txn: &Transaction<'_>,
        prefix: &str,
        mut mapper: F,
    ) -> Result<impl Iterator<Item = T>>
    where
        F: FnMut(RecordView<'_>) -> T,
    {
        self.check_owner(txn)?;
        let records = txn.scan(prefix)?;
        Ok(records
            .into_iter()
            .map(move |stored| codec::decode(stored.record.view(), &mut mapper)))
    }

    /// Metadata of every record whose key starts with `prefix`
    pub fn enumerate_metadata(&self, txn: &Transaction<'_>, prefix: &str) -> Result<Vec<RecordMetadata>> {
        self.check_owner(txn)?;
        Ok(txn.scan(prefix)?.iter().map(|stored| stored.metadata()).collect())
    }

    /// [`RawStore::enumerate`] collected into a `Vec`
    pub fn collect<T, F>(&self, txn: &Transaction<'_>, prefix: &str, mapper: F) -> Result<Vec<T>>
    where
        F: FnMut(RecordView<'_>) -> T,
    {
        Ok(self.enumerate(txn, prefix, mapper)?.collect())
    }
}

/// Map the "expected absent/present" failure of a try-operation to `false`
fn absent_as_false(result: Result<()>, is_expected: fn(&StoreError) -> bool) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if is_expected(&e) => Ok(false),
        Err(e) => Err(e),
    }
}
