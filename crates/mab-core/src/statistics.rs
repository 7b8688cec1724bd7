//! Per-scenario statistics and run aggregation
//!
//! Gen H is just another canonical lender during extraction; it only gets
//! special treatment here.

use crate::panel::{Lender, LenderAmounts};
use crate::record::{RankShare, RunSummary, ScenarioRecord};
use crate::types::{RunType, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derived figures for one scenario result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioStatistics {
    /// Floor mean of every extracted amount, Gen H included (0 when empty)
    pub average: u64,
    pub gen_h_amount: Option<u64>,
    /// `gen_h_amount - average`
    pub gen_h_vs_average_gap: Option<i64>,
    /// 1-based competition rank of Gen H; 0 when absent
    pub gen_h_rank: u32,
}

/// Competition rank of Gen H: 1 + lenders with a strictly larger amount
///
/// Returns 0 when Gen H has no amount.
#[must_use]
pub fn gen_h_rank(amounts: &LenderAmounts) -> u32 {
    let Some(gen_h) = amounts.get(Lender::GenH) else {
        return 0;
    };
    let above = amounts.iter().filter(|(_, a)| *a > gen_h).count();
    u32::try_from(above).map_or(u32::MAX, |n| n.saturating_add(1))
}

/// Compute statistics over one scenario's lender amounts
#[must_use]
pub fn scenario_statistics(amounts: &LenderAmounts) -> ScenarioStatistics {
    let count = amounts.len() as u64;
    let sum: u64 = amounts.iter().map(|(_, a)| a).sum();
    let average = sum.checked_div(count).unwrap_or(0);
    let gen_h_amount = amounts.get(Lender::GenH);
    let gen_h_vs_average_gap = gen_h_amount.map(|g| signed(g) - signed(average));

    ScenarioStatistics {
        average,
        gen_h_amount,
        gen_h_vs_average_gap,
        gen_h_rank: gen_h_rank(amounts),
    }
}

fn signed(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// In-memory aggregation across a batch
#[derive(Debug, Clone, Default)]
pub struct RunTally {
    total: usize,
    successful: usize,
    /// Gen H ranks of successful scenarios, zeros included
    ranks: Vec<u32>,
}

impl RunTally {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one written record
    pub fn record(&mut self, record: &ScenarioRecord) {
        self.total += 1;
        if record.successful {
            self.successful += 1;
            self.ranks
                .push(record.statistics.map_or(0, |s| s.gen_h_rank));
        }
    }

    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[inline]
    #[must_use]
    pub fn successful(&self) -> usize {
        self.successful
    }

    /// Mean of non-zero Gen H ranks over successful scenarios
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn average_gen_h_rank(&self) -> f64 {
        let ranked: Vec<u32> = self.ranks.iter().copied().filter(|r| *r > 0).collect();
        if ranked.is_empty() {
            return 0.0;
        }
        let sum: u64 = ranked.iter().map(|r| u64::from(*r)).sum();
        round2(sum as f64 / ranked.len() as f64)
    }

    /// Share of successful scenarios where Gen H ranked 1st, 2nd, 3rd
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn rank_share(&self) -> RankShare {
        if self.successful == 0 {
            return RankShare::default();
        }
        let share = |rank: u32| {
            let hits = self.ranks.iter().filter(|r| **r == rank).count();
            round2(hits as f64 * 100.0 / self.successful as f64)
        };
        let (first, second, third) = (share(1), share(2), share(3));
        RankShare {
            first,
            second,
            third,
            top3: round2(first + second + third),
        }
    }

    /// Build the run summary for this tally
    #[must_use]
    pub fn summary(
        &self,
        session_id: SessionId,
        run_type: RunType,
        started_at: DateTime<Utc>,
        aborted_reason: Option<String>,
    ) -> RunSummary {
        RunSummary {
            session_id,
            run_type,
            started_at,
            finished_at: Utc::now(),
            total_scenarios: self.total,
            successful_scenarios: self.successful,
            average_gen_h_rank: self.average_gen_h_rank(),
            rank_share: self.rank_share(),
            aborted_reason,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
