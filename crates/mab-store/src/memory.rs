//! In-memory run store for tests and dry runs

use crate::error::StoreError;
use crate::{assemble, RunStore, StoredRun};
use mab_core::{RunSummary, ScenarioRecord, SessionId};
use parking_lot::RwLock;

#[derive(Debug, Default)]
pub struct MemoryRunStore {
    records: RwLock<Vec<ScenarioRecord>>,
    summaries: RwLock<Vec<RunSummary>>,
}

impl MemoryRunStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every appended scenario row
    #[must_use]
    pub fn records(&self) -> Vec<ScenarioRecord> {
        self.records.read().clone()
    }

    #[must_use]
    pub fn summary_list(&self) -> Vec<RunSummary> {
        self.summaries.read().clone()
    }
}

#[async_trait::async_trait]
impl RunStore for MemoryRunStore {
    async fn append_scenario(&self, record: &ScenarioRecord) -> Result<(), StoreError> {
        self.records.write().push(record.clone());
        Ok(())
    }

    async fn append_summary(&self, summary: &RunSummary) -> Result<(), StoreError> {
        self.summaries.write().push(summary.clone());
        Ok(())
    }

    async fn load_session(&self, session_id: SessionId) -> Result<StoredRun, StoreError> {
        let records = self
            .records
            .read()
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect();
        let summary = self
            .summaries
            .read()
            .iter()
            .rev()
            .find(|s| s.session_id == session_id)
            .cloned();
        assemble(session_id, records, summary)
    }

    async fn summaries(&self) -> Result<Vec<RunSummary>, StoreError> {
        Ok(self.summary_list())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mab_core::{CaseKind, FailureKind, FailureRecord, Scenario, ScenarioState};

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let store = MemoryRunStore::new();
        let err = store.load_session(SessionId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn records_are_scoped_by_session() {
        let store = MemoryRunStore::new();
        let scenario = Scenario::new("E-Joint-060k", CaseKind::EJoint, 60_000, "T");
        let (a, b) = (SessionId::new(), SessionId::new());
        for session in [a, b, a] {
            let failure = FailureRecord::new(FailureKind::CaseNotFound, "missing", ScenarioState::LoggedIn);
            store
                .append_scenario(&ScenarioRecord::failed(session, &scenario, failure))
                .await
                .unwrap();
        }
        let run = store.load_session(a).await.unwrap();
        assert_eq!(run.records.len(), 2);
        assert!(run.summary.is_none());
    }
}
