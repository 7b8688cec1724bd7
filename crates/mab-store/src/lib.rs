//! MAB Store - append-only persistence for benchmark runs
//!
//! Two logical tables keyed by session id:
//! - scenario rows: one `ScenarioRecord` per executed scenario, failures included
//! - run summaries: one `RunSummary` per batch
//!
//! Records are appended at scenario boundaries and never rewritten, so a
//! crashed batch still leaves every completed scenario on disk.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod jsonl;
pub mod memory;

pub use error::StoreError;
pub use jsonl::JsonlRunStore;
pub use memory::MemoryRunStore;

use mab_core::{RunSummary, ScenarioRecord, SessionId};

/// Everything stored for one session
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRun {
    pub session_id: SessionId,
    /// Scenario rows in append order
    pub records: Vec<ScenarioRecord>,
    /// Absent when the batch died before writing its summary
    pub summary: Option<RunSummary>,
}

/// Append-only run store
#[async_trait::async_trait]
pub trait RunStore: Send + Sync {
    /// Append one scenario row; durable once this returns
    async fn append_scenario(&self, record: &ScenarioRecord) -> Result<(), StoreError>;

    /// Append the run summary
    async fn append_summary(&self, summary: &RunSummary) -> Result<(), StoreError>;

    /// Load every row and the summary of a session
    ///
    /// # Errors
    /// `StoreError::SessionNotFound` when nothing was stored for `session_id`.
    async fn load_session(&self, session_id: SessionId) -> Result<StoredRun, StoreError>;

    /// All stored summaries, oldest first
    async fn summaries(&self) -> Result<Vec<RunSummary>, StoreError>;
}

pub(crate) fn assemble(
    session_id: SessionId,
    records: Vec<ScenarioRecord>,
    summary: Option<RunSummary>,
) -> Result<StoredRun, StoreError> {
    if records.is_empty() && summary.is_none() {
        return Err(StoreError::SessionNotFound(session_id.to_string()));
    }
    Ok(StoredRun {
        session_id,
        records,
        summary,
    })
}
