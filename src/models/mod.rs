// src/models/mod.rs

//! Domain models for the watcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod posting;
mod record;
mod snapshot;
mod state;

// Re-export all public types
pub use config::{
    Config, EmailConfig, FetchMode, FirstRunPolicy, HttpConfig, MonitorConfig, SearchConfig,
    StorageConfig,
};
pub use posting::{Posting, extract_job_id};
pub use record::{IpRecord, ParseAnomaly, RunOutcome, RunRecord};
pub use snapshot::Snapshot;
pub use state::NotificationState;
