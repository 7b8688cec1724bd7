//! Plain-text rendering of records and summaries

use mab_core::{Coverage, RunSummary, ScenarioRecord, ScenarioStatus};
use std::fmt::Write as _;

/// One line per scenario
#[must_use]
pub fn render_records(records: &[ScenarioRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<22} {:<12} {:>9} {:>7} {:>5} {:>10} {:>9}  {}",
        "scenario", "case", "income", "lenders", "rank", "gen_h", "gap", "outcome"
    );
    for record in records {
        let stats = record.statistics;
        let gen_h = stats
            .and_then(|s| s.gen_h_amount)
            .map_or_else(|| "-".to_string(), |v| v.to_string());
        let gap = stats
            .and_then(|s| s.gen_h_vs_average_gap)
            .map_or_else(|| "-".to_string(), |v| format!("{v:+}"));
        let _ = writeln!(
            out,
            "{:<22} {:<12} {:>9} {:>7} {:>5} {:>10} {:>9}  {}",
            record.scenario_id.as_str(),
            record.case_kind.label(),
            record.total_income,
            record.lender_count(),
            record.gen_h_rank(),
            gen_h,
            gap,
            outcome(record)
        );
    }
    out
}

fn outcome(record: &ScenarioRecord) -> String {
    if record.status == ScenarioStatus::Failed {
        return record.failure.as_ref().map_or_else(
            || "FAILED".to_string(),
            |f| format!("FAILED {} at {}", f.kind, f.state),
        );
    }
    let mut text = if record.successful { "ok" } else { "unusable" }.to_string();
    if record.coverage == Coverage::Partial {
        text.push_str(" partial");
    }
    for warning in &record.warnings {
        let _ = write!(text, " {warning}");
    }
    text
}

/// Multi-line batch summary
#[must_use]
pub fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Session:      {}", summary.session_id);
    let _ = writeln!(out, "Run type:     {}", summary.run_type);
    let _ = writeln!(
        out,
        "Scenarios:    {} attempted, {} successful",
        summary.total_scenarios, summary.successful_scenarios
    );
    let _ = writeln!(out, "Avg Gen H rank: {:.2}", summary.average_gen_h_rank);
    let share = summary.rank_share;
    let _ = writeln!(
        out,
        "Rank share:   1st {:.2}%  2nd {:.2}%  3rd {:.2}%  top3 {:.2}%",
        share.first, share.second, share.third, share.top3
    );
    let elapsed = summary.finished_at - summary.started_at;
    let _ = writeln!(out, "Duration:     {}s", elapsed.num_seconds());
    if let Some(reason) = &summary.aborted_reason {
        let _ = writeln!(out, "Aborted:      {reason}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mab_core::{
        CaseKind, FailureKind, FailureRecord, RankShare, RunType, Scenario, ScenarioState,
        SessionId,
    };

    #[test]
    fn failed_row_names_kind_and_state() {
        let scenario = Scenario::new("E-Single-030k", CaseKind::ESingle, 30_000, "MAB-TPL-E-SINGLE");
        let record = ScenarioRecord::failed(
            SessionId::new(),
            &scenario,
            FailureRecord::new(FailureKind::CaseNotFound, "no row", ScenarioState::LoggedIn),
        );
        let text = render_records(&[record]);
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("E-Single-030k"));
        assert!(text.contains("FAILED CaseNotFound at LOGGED_IN"));
    }

    #[test]
    fn summary_mentions_abort() {
        let now = Utc::now();
        let summary = RunSummary {
            session_id: SessionId::new(),
            run_type: RunType::Credit,
            started_at: now,
            finished_at: now,
            total_scenarios: 4,
            successful_scenarios: 2,
            average_gen_h_rank: 2.5,
            rank_share: RankShare {
                first: 50.0,
                second: 0.0,
                third: 0.0,
                top3: 50.0,
            },
            aborted_reason: Some("sign-in rejected".into()),
        };
        let text = render_summary(&summary);
        assert!(text.contains("4 attempted, 2 successful"));
        assert!(text.contains("Avg Gen H rank: 2.50"));
        assert!(text.contains("top3 50.00%"));
        assert!(text.contains("Aborted:      sign-in rejected"));
    }
}
