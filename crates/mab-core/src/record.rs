//! Result records and run summaries
//!
//! A `ScenarioRecord` is written once per scenario execution, failures
//! included, and never changes afterwards. A `RunSummary` closes a batch.

use crate::budget::WaitVerdict;
use crate::error::FailureKind;
use crate::extraction::Extraction;
use crate::panel::LenderAmounts;
use crate::state::ScenarioState;
use crate::statistics::{scenario_statistics, ScenarioStatistics};
use crate::types::{CaseKind, Coverage, ExtractionSource, RunType, Scenario, ScenarioId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal status of a scenario execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioStatus {
    Extracted,
    Failed,
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extracted => f.write_str("EXTRACTED"),
            Self::Failed => f.write_str("FAILED"),
        }
    }
}

/// Why a scenario failed, and where
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub kind: FailureKind,
    /// Human-readable reason
    pub reason: String,
    /// Last state reached before failing
    pub state: ScenarioState,
}

impl FailureRecord {
    #[must_use]
    pub fn new(kind: FailureKind, reason: impl Into<String>, state: ScenarioState) -> Self {
        Self {
            kind,
            reason: reason.into(),
            state,
        }
    }
}

/// What the results waiter observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitReport {
    pub budget_ms: u64,
    pub elapsed_ms: u64,
    pub polls: u32,
    pub verdict: WaitVerdict,
    pub last_lender_count: usize,
    pub last_sigil_count: usize,
}

/// Rules deciding whether an extracted scenario counts as successful
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessPolicy {
    /// Lender count below which coverage is partial
    pub min_lenders: usize,
    /// Count partial coverage as successful
    pub accept_partials: bool,
}

impl Default for SuccessPolicy {
    fn default() -> Self {
        Self {
            min_lenders: 12,
            accept_partials: false,
        }
    }
}

impl SuccessPolicy {
    #[inline]
    #[must_use]
    pub fn with_accept_partials(mut self, accept: bool) -> Self {
        self.accept_partials = accept;
        self
    }

    #[inline]
    #[must_use]
    pub fn coverage(&self, lender_count: usize) -> Coverage {
        if lender_count < self.min_lenders {
            Coverage::Partial
        } else {
            Coverage::Full
        }
    }
}

/// One scenario's outcome within a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub session_id: SessionId,
    pub scenario_id: ScenarioId,
    pub case_kind: CaseKind,
    pub total_income: u64,
    pub run_timestamp: DateTime<Utc>,
    pub status: ScenarioStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureRecord>,
    #[serde(default)]
    pub lender_amounts: LenderAmounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<ScenarioStatistics>,
    pub coverage: Coverage,
    /// No recomputation control was found; amounts may be cached
    #[serde(default)]
    pub stale: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ExtractionSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<FailureKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<WaitReport>,
    /// Counted towards `successful_scenarios`
    pub successful: bool,
}

impl ScenarioRecord {
    /// Record for a scenario that reached `EXTRACTED`
    #[must_use]
    pub fn extracted(
        session_id: SessionId,
        scenario: &Scenario,
        extraction: Extraction,
        wait: WaitReport,
        stale: bool,
        policy: SuccessPolicy,
    ) -> Self {
        let coverage = policy.coverage(extraction.lender_count());
        let mut warnings = Vec::new();
        if stale {
            warnings.push(FailureKind::NoRecomputationControl);
        }
        if wait.verdict == WaitVerdict::Partial {
            warnings.push(FailureKind::ResultsIncomplete);
        }
        if extraction.source == ExtractionSource::TextFallback {
            warnings.push(FailureKind::NoTableFound);
        }

        let successful = !stale
            && !extraction.amounts.is_empty()
            && (coverage == Coverage::Full || policy.accept_partials);

        Self {
            session_id,
            scenario_id: scenario.id.clone(),
            case_kind: scenario.case_kind,
            total_income: scenario.total_income,
            run_timestamp: Utc::now(),
            status: ScenarioStatus::Extracted,
            failure: None,
            statistics: Some(scenario_statistics(&extraction.amounts)),
            lender_amounts: extraction.amounts,
            coverage,
            stale,
            source: Some(extraction.source),
            warnings,
            wait: Some(wait),
            successful,
        }
    }

    /// Record for a scenario that ended in `FAILED`
    #[must_use]
    pub fn failed(session_id: SessionId, scenario: &Scenario, failure: FailureRecord) -> Self {
        Self {
            session_id,
            scenario_id: scenario.id.clone(),
            case_kind: scenario.case_kind,
            total_income: scenario.total_income,
            run_timestamp: Utc::now(),
            status: ScenarioStatus::Failed,
            failure: Some(failure),
            lender_amounts: LenderAmounts::new(),
            statistics: None,
            coverage: Coverage::Partial,
            stale: false,
            source: None,
            warnings: Vec::new(),
            wait: None,
            successful: false,
        }
    }

    /// Override the timestamp
    #[inline]
    #[must_use]
    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.run_timestamp = at;
        self
    }

    #[inline]
    #[must_use]
    pub fn lender_count(&self) -> usize {
        self.lender_amounts.len()
    }

    #[inline]
    #[must_use]
    pub fn gen_h_rank(&self) -> u32 {
        self.statistics.map_or(0, |s| s.gen_h_rank)
    }
}

/// Percentage of successful scenarios where Gen H ranked 1st, 2nd, 3rd
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RankShare {
    #[serde(rename = "1")]
    pub first: f64,
    #[serde(rename = "2")]
    pub second: f64,
    #[serde(rename = "3")]
    pub third: f64,
    pub top3: f64,
}

/// Per-batch summary appended to the run store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub session_id: SessionId,
    pub run_type: RunType,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Scenarios attempted in this run
    pub total_scenarios: usize,
    pub successful_scenarios: usize,
    pub average_gen_h_rank: f64,
    pub rank_share: RankShare,
    /// Set when a batch-fatal error ended the run early
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted_reason: Option<String>,
}

impl RunSummary {
    #[inline]
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted_reason.is_some()
    }
}
