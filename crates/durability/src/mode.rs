//! Durability mode for WAL operations.
//!
//! Defines the durability guarantees for WAL writes.

use serde::{Deserialize, Serialize};

/// Durability mode for WAL writes.
///
/// Controls when data is fsynced to disk and the trade-off between
/// performance and durability.
///
/// # Mode Comparison
///
/// | Mode | fsync | Use Case |
/// |------|-------|----------|
/// | None | never | Tests, caches, ephemeral data |
/// | Batched | every N commits or T ms | Production (balanced) |
/// | Strict | every commit | Audit logs, critical state |
///
/// In configuration files the mode is a table tagged by `mode`:
///
/// ```toml
/// [durability]
/// mode = "batched"
/// interval_ms = 100
/// batch_size = 1000
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DurabilityMode {
    /// No fsync. Data written to the WAL may be lost on crash.
    None,

    /// fsync after every commit (slow, maximum durability).
    Strict,

    /// fsync every `batch_size` commits OR every `interval_ms` milliseconds.
    ///
    /// Both limits are checked when a commit is appended; there is no
    /// background flusher. After the last commit of a burst the log stays
    /// unsynced until the next commit, an explicit `flush`, or the database
    /// is dropped. Callers that go idle and need the tail on disk call
    /// `Database::flush`.
    ///
    /// May lose up to `batch_size` commits, or everything since the last
    /// fsync of an idle database, on crash.
    Batched {
        /// Maximum time between fsyncs in milliseconds
        interval_ms: u64,
        /// Maximum commits between fsyncs
        batch_size: usize,
    },
}

impl DurabilityMode {
    /// Human-readable description of the mode.
    pub fn description(&self) -> &'static str {
        match self {
            DurabilityMode::None => "No fsync (fastest, recent commits lost on crash)",
            DurabilityMode::Strict => "Sync fsync (safest, slowest)",
            DurabilityMode::Batched { .. } => "Batched fsync (balanced speed/safety)",
        }
    }

    /// Create a batched mode with recommended defaults.
    ///
    /// Returns `Batched { interval_ms: 100, batch_size: 1000 }`.
    pub fn buffered_default() -> Self {
        DurabilityMode::Batched {
            interval_ms: 100,
            batch_size: 1000,
        }
    }
}

impl Default for DurabilityMode {
    fn default() -> Self {
        Self::buffered_default()
    }
}
