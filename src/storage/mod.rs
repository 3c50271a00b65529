//! Snapshot store abstractions.
//!
//! The store keeps one committed state (last snapshot + notification state)
//! and two append-only histories.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml      # Optional configuration
//! ├── state.json       # Committed snapshot + notification state
//! ├── runs.jsonl       # Run history, one JSON object per line
//! └── ip_log.jsonl     # Public IP history, one JSON object per line
//! ```
//!
//! No cross-process locking is done: two watchers sharing a directory are
//! only protected by the atomic rename of `state.json`.

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{IpRecord, NotificationState, RunRecord, Snapshot};

// Re-export for convenience
pub use local::LocalStorage;

/// Contents of `state.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredState {
    /// When this state was committed
    pub updated_at: DateTime<Utc>,
    pub snapshot: Snapshot,
    pub notification: NotificationState,
}

/// Trait for snapshot store backends.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the last committed state.
    ///
    /// `None` for the snapshot means nothing was ever committed (first run).
    async fn load_state(&self) -> Result<(Option<Snapshot>, NotificationState)>;

    /// Persist snapshot and notification state together, atomically.
    async fn save_state(&self, snapshot: &Snapshot, notification: &NotificationState)
    -> Result<()>;

    /// Append one row of run history.
    async fn append_run(&self, record: &RunRecord) -> Result<()>;

    /// Append one row of IP history.
    async fn append_ip(&self, record: &IpRecord) -> Result<()>;
}
