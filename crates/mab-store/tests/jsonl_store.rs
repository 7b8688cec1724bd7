use chrono::Utc;
use mab_core::{
    CaseKind, Extraction, ExtractionSource, FailureKind, FailureRecord, Lender, RunTally, RunType,
    Scenario, ScenarioRecord, ScenarioState, SessionId, SuccessPolicy, WaitReport, WaitVerdict,
};
use mab_store::{JsonlRunStore, RunStore, StoreError};
use pretty_assertions::assert_eq;

fn extracted(session: SessionId) -> ScenarioRecord {
    let scenario = Scenario::new("E-Single-030k", CaseKind::ESingle, 30_000, "MAB-TPL-E-SINGLE");
    let extraction = Extraction {
        amounts: [(Lender::GenH, 150_000), (Lender::Halifax, 140_000)]
            .into_iter()
            .collect(),
        source: ExtractionSource::Table,
        rows_seen: 2,
        rows_unmatched: 0,
        rows_rejected: 0,
    };
    let wait = WaitReport {
        budget_ms: 324_000,
        elapsed_ms: 75_000,
        polls: 3,
        verdict: WaitVerdict::Partial,
        last_lender_count: 2,
        last_sigil_count: 4,
    };
    ScenarioRecord::extracted(session, &scenario, extraction, wait, false, SuccessPolicy::default())
}

fn failed(session: SessionId) -> ScenarioRecord {
    let scenario = Scenario::new("S-Joint-200k", CaseKind::SJoint, 200_000, "MAB-TPL-S-JOINT");
    ScenarioRecord::failed(
        session,
        &scenario,
        FailureRecord::new(
            FailureKind::FieldWriteMismatch,
            "net profit (last year): intended 100000, observed 1100000",
            ScenarioState::AtIncome,
        ),
    )
}

#[tokio::test]
async fn test_append_and_load_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlRunStore::open(dir.path().join("runs")).await.unwrap();
    let session = SessionId::new();
    let other = SessionId::new();

    let mut tally = RunTally::new();
    for record in [extracted(session), failed(other), failed(session)] {
        store.append_scenario(&record).await.unwrap();
        if record.session_id == session {
            tally.record(&record);
        }
    }
    let summary = tally.summary(session, RunType::Normal, Utc::now(), None);
    store.append_summary(&summary).await.unwrap();

    let run = store.load_session(session).await.unwrap();
    assert_eq!(run.records.len(), 2);
    assert_eq!(run.records[0], extracted_like(&run.records[0]));
    assert_eq!(run.summary, Some(summary));

    let other_run = store.load_session(other).await.unwrap();
    assert_eq!(other_run.records.len(), 1);
    assert!(other_run.summary.is_none());
}

// timestamps differ between constructions; compare against the stored row
fn extracted_like(stored: &ScenarioRecord) -> ScenarioRecord {
    extracted(stored.session_id).with_timestamp(stored.run_timestamp)
}

#[tokio::test]
async fn test_rows_are_one_json_object_per_line() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlRunStore::open(dir.path()).await.unwrap();
    let session = SessionId::new();
    store.append_scenario(&extracted(session)).await.unwrap();
    store.append_scenario(&failed(session)).await.unwrap();

    let text = std::fs::read_to_string(store.scenario_rows_path()).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["lender_amounts"]["Gen H"], 150_000);
    assert_eq!(first["coverage"], "partial");
    let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second["failure"]["kind"], "FieldWriteMismatch");
}

#[tokio::test]
async fn test_reopen_keeps_existing_rows() {
    let dir = tempfile::tempdir().unwrap();
    let session = SessionId::new();
    {
        let store = JsonlRunStore::open(dir.path()).await.unwrap();
        store.append_scenario(&failed(session)).await.unwrap();
    }
    let store = JsonlRunStore::open(dir.path()).await.unwrap();
    store.append_scenario(&failed(session)).await.unwrap();
    assert_eq!(store.load_session(session).await.unwrap().records.len(), 2);
}

#[tokio::test]
async fn test_corrupt_line_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlRunStore::open(dir.path()).await.unwrap();
    store.append_scenario(&failed(SessionId::new())).await.unwrap();
    let mut text = std::fs::read_to_string(store.scenario_rows_path()).unwrap();
    text.push_str("{not json\n");
    std::fs::write(store.scenario_rows_path(), text).unwrap();

    let err = store.load_session(SessionId::new()).await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { line: 2, .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_missing_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlRunStore::open(dir.path()).await.unwrap();
    assert!(matches!(
        store.load_session(SessionId::new()).await,
        Err(StoreError::SessionNotFound(_))
    ));
    assert!(store.summaries().await.unwrap().is_empty());
}
