//! Resolved transaction writeset
//!
//! A writeset is what a transaction leaves behind once commit-time validation
//! has resolved its staged operations: at most one mutation per key, with
//! final sequence numbers already minted.

use rawkv_core::{Key, Record, SequenceNumber};

/// A single resolved mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Create or replace the record
    Put(Record),

    /// Remove the key, remembering the last sequence number of its lineage
    Delete {
        /// Key being removed
        key: Key,
        /// High-water sequence number of the removed lineage
        retired: SequenceNumber,
    },
}

/// Ordered set of resolved mutations applied as one unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Writeset {
    mutations: Vec<Mutation>,
}

impl Writeset {
    /// Create an empty writeset
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mutation
    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    /// Number of mutations
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// Check if there is nothing to apply
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Iterate over mutations in order
    pub fn iter(&self) -> std::slice::Iter<'_, Mutation> {
        self.mutations.iter()
    }
}

impl From<Vec<Mutation>> for Writeset {
    fn from(mutations: Vec<Mutation>) -> Self {
        Self { mutations }
    }
}

impl<'a> IntoIterator for &'a Writeset {
    type Item = &'a Mutation;
    type IntoIter = std::slice::Iter<'a, Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.iter()
    }
}

impl IntoIterator for Writeset {
    type Item = Mutation;
    type IntoIter = std::vec::IntoIter<Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.into_iter()
    }
}
