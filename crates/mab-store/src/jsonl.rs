//! JSON-lines run store
//!
//! Layout inside the store directory:
//!
//! ```text
//! scenario_rows.jsonl   one ScenarioRecord per line
//! run_summaries.jsonl   one RunSummary per line
//! ```
//!
//! Each append opens the file in append mode, writes one line and syncs
//! before returning.

use crate::error::StoreError;
use crate::{assemble, RunStore, StoredRun};
use mab_core::{RunSummary, ScenarioRecord, SessionId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub const SCENARIO_ROWS_FILE: &str = "scenario_rows.jsonl";
pub const RUN_SUMMARIES_FILE: &str = "run_summaries.jsonl";

/// File-backed append-only store
#[derive(Debug)]
pub struct JsonlRunStore {
    dir: PathBuf,
    // serialises appends from one process
    write_lock: Mutex<()>,
}

impl JsonlRunStore {
    /// Open (creating if needed) a store directory
    ///
    /// # Errors
    /// `StoreError::Io` if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;
        tracing::debug!(dir = %dir.display(), "Opened run store");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn scenario_rows_path(&self) -> PathBuf {
        self.dir.join(SCENARIO_ROWS_FILE)
    }

    #[must_use]
    pub fn run_summaries_path(&self) -> PathBuf {
        self.dir.join(RUN_SUMMARIES_FILE)
    }

    async fn append_line<T: Serialize + Sync>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| StoreError::io(path, e))?;
        file.write_all(&line)
            .await
            .map_err(|e| StoreError::io(path, e))?;
        file.flush().await.map_err(|e| StoreError::io(path, e))?;
        file.sync_data().await.map_err(|e| StoreError::io(path, e))?;
        Ok(())
    }

    async fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|source| StoreError::Corrupt {
                    path: path.to_path_buf(),
                    line: i + 1,
                    source,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl RunStore for JsonlRunStore {
    async fn append_scenario(&self, record: &ScenarioRecord) -> Result<(), StoreError> {
        self.append_line(&self.scenario_rows_path(), record).await?;
        tracing::debug!(
            session_id = %record.session_id,
            scenario_id = %record.scenario_id,
            status = %record.status,
            "Appended scenario row"
        );
        Ok(())
    }

    async fn append_summary(&self, summary: &RunSummary) -> Result<(), StoreError> {
        self.append_line(&self.run_summaries_path(), summary).await?;
        tracing::debug!(session_id = %summary.session_id, "Appended run summary");
        Ok(())
    }

    async fn load_session(&self, session_id: SessionId) -> Result<StoredRun, StoreError> {
        let records: Vec<ScenarioRecord> = Self::read_lines(&self.scenario_rows_path()).await?;
        let summaries: Vec<RunSummary> = Self::read_lines(&self.run_summaries_path()).await?;

        let records = records
            .into_iter()
            .filter(|r| r.session_id == session_id)
            .collect();
        // last summary wins
        let summary = summaries
            .into_iter()
            .filter(|s| s.session_id == session_id)
            .last();
        assemble(session_id, records, summary)
    }

    async fn summaries(&self) -> Result<Vec<RunSummary>, StoreError> {
        Self::read_lines(&self.run_summaries_path()).await
    }
}
