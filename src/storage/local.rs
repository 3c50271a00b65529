//! Local filesystem storage implementation.
//!
//! `state.json` is replaced with write-to-temp, fsync, rename so a process
//! killed mid-write leaves the previous commit intact. History files are
//! JSON Lines opened in append mode.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{IpRecord, NotificationState, RunRecord, Snapshot};
use crate::storage::{SnapshotStore, StoredState};

const STATE_KEY: &str = "state.json";
const RUNS_KEY: &str = "runs.jsonl";
const IP_LOG_KEY: &str = "ip_log.jsonl";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    default_cooldown_secs: u64,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            default_cooldown_secs: 0,
        }
    }

    /// Cooldown reported by `load_state` before anything was committed.
    pub fn with_default_cooldown(mut self, cooldown_secs: u64) -> Self {
        self.default_cooldown_secs = cooldown_secs;
        self
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, sync, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Append one JSON object as a line.
    async fn append_line<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }

    /// Read every line of a JSON Lines file, skipping blank lines.
    async fn read_lines<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        let Some(bytes) = self.read_bytes(key).await? else {
            return Ok(Vec::new());
        };
        let text = String::from_utf8_lossy(&bytes);
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(AppError::from))
            .collect()
    }

    /// Load the raw committed state, if any.
    pub async fn load_stored(&self) -> Result<Option<StoredState>> {
        self.read_json(STATE_KEY)
            .await
            .map_err(|e| AppError::storage(format!("loading {STATE_KEY}: {e}")))
    }

    /// Read the full run history.
    pub async fn read_runs(&self) -> Result<Vec<RunRecord>> {
        self.read_lines(RUNS_KEY).await
    }

    /// Read the full IP history.
    pub async fn read_ips(&self) -> Result<Vec<IpRecord>> {
        self.read_lines(IP_LOG_KEY).await
    }
}

#[async_trait]
impl SnapshotStore for LocalStorage {
    async fn load_state(&self) -> Result<(Option<Snapshot>, NotificationState)> {
        match self.load_stored().await? {
            Some(stored) => Ok((Some(stored.snapshot), stored.notification)),
            None => {
                log::info!("No {} in {}; first run", STATE_KEY, self.root_dir.display());
                Ok((None, NotificationState::new(self.default_cooldown_secs)))
            }
        }
    }

    async fn save_state(
        &self,
        snapshot: &Snapshot,
        notification: &NotificationState,
    ) -> Result<()> {
        let stored = StoredState {
            updated_at: Utc::now(),
            snapshot: snapshot.clone(),
            notification: *notification,
        };
        self.write_json(STATE_KEY, &stored)
            .await
            .map_err(|e| AppError::storage(format!("saving {STATE_KEY}: {e}")))
    }

    async fn append_run(&self, record: &RunRecord) -> Result<()> {
        self.append_line(RUNS_KEY, record)
            .await
            .map_err(|e| AppError::storage(format!("appending to {RUNS_KEY}: {e}")))
    }

    async fn append_ip(&self, record: &IpRecord) -> Result<()> {
        self.append_line(IP_LOG_KEY, record)
            .await
            .map_err(|e| AppError::storage(format!("appending to {IP_LOG_KEY}: {e}")))
    }
}
