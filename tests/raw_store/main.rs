//! Raw Store Integration Tests
//!
//! End-to-end tests through the public facade: store operations, prefix
//! enumeration, transaction lifecycle, concurrent commits, sequence lineage,
//! WAL recovery, and the entity persistence boundary.


mod basic_ops;
mod durability;
mod entity_boundary;
mod lineage;
mod transactions;
