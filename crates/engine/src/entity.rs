//! Entity persistence modes
//!
//! An [`Entity`] is registered with one [`PersistenceMode`] and gets exactly
//! one way to persist state:
//!
//! - `Raw`: a [`RawStore`] over the whole record set
//! - `Managed`: a typed [`StateManager`] that keeps MessagePack values under
//!   the key prefix `"{entity_id}/state/"`
//!
//! Asking for the other one fails with `InvalidOperation`.

use crate::database::Database;
use crate::projection;
use crate::store::RawStore;
use rawkv_core::{Result, StoreError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How an entity persists its state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceMode {
    /// Byte-level access through [`RawStore`]
    Raw,
    /// Typed access through [`StateManager`]
    Managed,
}

impl std::fmt::Display for PersistenceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceMode::Raw => write!(f, "raw"),
            PersistenceMode::Managed => write!(f, "managed"),
        }
    }
}

/// A persistent entity bound to one persistence mode
#[derive(Debug, Clone)]
pub struct Entity {
    id: String,
    mode: PersistenceMode,
    db: Arc<Database>,
}

impl Entity {
    /// Register an entity
    ///
    /// # Errors
    /// `InvalidOperation` if `id` is empty or contains `/`.
    pub fn new(id: impl Into<String>, mode: PersistenceMode, db: Arc<Database>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || id.contains('/') {
            return Err(StoreError::InvalidOperation(format!(
                "invalid entity id {:?}: must be non-empty and contain no '/'",
                id
            )));
        }
        Ok(Self { id, mode, db })
    }

    /// Entity identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Persistence mode
    pub fn mode(&self) -> PersistenceMode {
        self.mode
    }

    /// Raw store access
    ///
    /// # Errors
    /// `InvalidOperation` for a `Managed` entity.
    pub fn raw_store(&self) -> Result<RawStore> {
        match self.mode {
            PersistenceMode::Raw => Ok(RawStore::new(Arc::clone(&self.db))),
            PersistenceMode::Managed => Err(self.wrong_mode("raw store")),
        }
    }

    /// Managed state access
    ///
    /// # Errors
    /// `InvalidOperation` for a `Raw` entity.
    pub fn state_manager(&self) -> Result<StateManager> {
        match self.mode {
            PersistenceMode::Managed => Ok(StateManager::new(&self.id, Arc::clone(&self.db))),
            PersistenceMode::Raw => Err(self.wrong_mode("state manager")),
        }
    }

    fn wrong_mode(&self, requested: &str) -> StoreError {
        StoreError::InvalidOperation(format!(
            "entity {} uses {} persistence; {} is not available",
            self.id, self.mode, requested
        ))
    }
}

/// Typed state of one managed entity
///
/// Each call runs in its own transaction. Values are MessagePack-encoded.
/// A concurrent writer to the same name makes `set_state` fail with
/// `VersionConflict`; the caller retries.
#[derive(Debug, Clone)]
pub struct StateManager {
    prefix: String,
    store: RawStore,
}

impl StateManager {
    fn new(entity_id: &str, db: Arc<Database>) -> Self {
        Self {
            prefix: format!("{}/state/", entity_id),
            store: RawStore::new(db),
        }
    }

    /// Key prefix under which this entity's state lives
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn key_for(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Read a named state value
    pub fn get_state<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let key = self.key_for(name);
        self.store.database().transaction(|txn| {
            self.store
                .try_get(txn, &key, projection::msgpack::<T>)?
                .transpose()
        })
    }

    /// Write a named state value, creating or replacing it
    pub fn set_state<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let key = self.key_for(name);
        let bytes = rmp_serde::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.database().transaction(|txn| {
            match self.store.try_get(txn, &key, projection::sequence_number)? {
                Some(current) => self.store.update(txn, &key, &bytes, current),
                None => self.store.add(txn, &key, &bytes),
            }
        })
    }

    /// Remove a named state value
    ///
    /// Returns `false` if it did not exist.
    pub fn remove_state(&self, name: &str) -> Result<bool> {
        let key = self.key_for(name);
        self.store
            .database()
            .transaction(|txn| self.store.try_remove(txn, &key))
    }

    /// Check if a named state value exists
    pub fn contains_state(&self, name: &str) -> Result<bool> {
        let key = self.key_for(name);
        self.store
            .database()
            .transaction(|txn| self.store.contains(txn, &key))
    }

    /// Names of every stored state value, sorted
    pub fn state_names(&self) -> Result<Vec<String>> {
        let prefix_len = self.prefix.len();
        self.store.database().transaction(|txn| {
            self.store
                .collect(txn, &self.prefix, |view| view.key[prefix_len..].to_string())
        })
    }
}
