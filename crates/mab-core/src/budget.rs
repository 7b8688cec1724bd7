//! Adaptive results-wait policy
//!
//! The Portal fills the results table over a latency envelope that grows
//! with income and with joint applicants. The wait budget is derived from
//! the scenario shape:
//!
//! ```text
//! income_factor = max(1.2, total_income / 30_000)
//! joint_factor  = 3.0 if joint else 1.5
//! budget_ms     = min(180_000 * income_factor * joint_factor, 600_000)
//! ```
//!
//! Population is "loaded" after three consecutive polls with at least 12
//! lenders, at least 15 currency sigils and an unchanged lender count.

use crate::types::Scenario;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wait budget and stability thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitPolicy {
    /// Budget before scaling
    pub base_ms: u64,
    /// Hard ceiling on the budget
    pub max_ms: u64,
    /// Income divisor for the income factor
    pub income_unit: u64,
    /// Lower bound of the income factor
    pub min_income_factor: f64,
    pub joint_factor: f64,
    pub single_factor: f64,
    /// Mandatory wait before the first poll
    pub initial_wait_ms: u64,
    pub poll_interval_ms: u64,
    pub min_lenders: usize,
    pub min_sigils: usize,
    /// Consecutive qualifying polls required
    pub stable_polls: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            base_ms: 180_000,
            max_ms: 600_000,
            income_unit: 30_000,
            min_income_factor: 1.2,
            joint_factor: 3.0,
            single_factor: 1.5,
            initial_wait_ms: 60_000,
            poll_interval_ms: 7_500,
            min_lenders: 12,
            min_sigils: 15,
            stable_polls: 3,
        }
    }
}

impl WaitPolicy {
    /// Create the default policy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a different initial wait
    #[inline]
    #[must_use]
    pub fn with_initial_wait(mut self, wait: Duration) -> Self {
        self.initial_wait_ms = duration_ms(wait);
        self
    }

    /// With a different poll interval
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = duration_ms(interval);
        self
    }

    /// Budget in milliseconds for a scenario shape
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[must_use]
    pub fn budget_ms(&self, total_income: u64, joint: bool) -> u64 {
        let income_factor =
            (total_income as f64 / self.income_unit as f64).max(self.min_income_factor);
        let shape_factor = if joint {
            self.joint_factor
        } else {
            self.single_factor
        };
        let raw = self.base_ms as f64 * income_factor * shape_factor;
        (raw.round() as u64).min(self.max_ms)
    }

    /// Budget for a scenario
    #[must_use]
    pub fn budget_for(&self, scenario: &Scenario) -> Duration {
        Duration::from_millis(self.budget_ms(scenario.total_income, scenario.case_kind.is_joint()))
    }

    #[inline]
    #[must_use]
    pub fn initial_wait(&self) -> Duration {
        Duration::from_millis(self.initial_wait_ms)
    }

    #[inline]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Fresh stability tracker using this policy's thresholds
    #[must_use]
    pub fn tracker(&self) -> StabilityTracker {
        StabilityTracker::new(self.min_lenders, self.min_sigils, self.stable_polls)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// What one poll saw on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollObservation {
    /// Distinct canonical lenders in page text
    pub lenders: usize,
    /// Currency sigils in page text
    pub sigils: usize,
}

/// Outcome of a results wait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitVerdict {
    Loaded,
    Partial,
}

/// Consecutive-poll stability rule
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    min_lenders: usize,
    min_sigils: usize,
    required: u32,
    streak: u32,
    last_lenders: Option<usize>,
}

impl StabilityTracker {
    #[must_use]
    pub fn new(min_lenders: usize, min_sigils: usize, required: u32) -> Self {
        Self {
            min_lenders,
            min_sigils,
            required,
            streak: 0,
            last_lenders: None,
        }
    }

    /// Feed one poll; returns `true` once the page counts as loaded
    pub fn observe(&mut self, obs: PollObservation) -> bool {
        let qualifies = obs.lenders >= self.min_lenders && obs.sigils >= self.min_sigils;
        let unchanged = self.last_lenders == Some(obs.lenders);

        self.streak = match (qualifies, unchanged) {
            (false, _) => 0,
            (true, true) if self.streak > 0 => self.streak + 1,
            (true, _) => 1,
        };
        self.last_lenders = Some(obs.lenders);
        self.is_loaded()
    }

    /// Current run of qualifying, unchanged polls
    #[inline]
    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.streak >= self.required
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CaseKind;

    fn obs(lenders: usize, sigils: usize) -> PollObservation {
        PollObservation { lenders, sigils }
    }

    #[test]
    fn single_low_income_uses_minimum_factor() {
        let policy = WaitPolicy::default();
        // 180_000 * 1.2 * 1.5
        assert_eq!(policy.budget_ms(30_000, false), 324_000);
        assert_eq!(policy.budget_ms(10_000, false), 324_000);
    }

    #[test]
    fn joint_high_income_is_capped() {
        let policy = WaitPolicy::default();
        assert_eq!(policy.budget_ms(200_000, true), 600_000);
        let scenario = Scenario::new("S-Joint-200k", CaseKind::SJoint, 200_000, "T");
        assert_eq!(policy.budget_for(&scenario), Duration::from_secs(600));
    }

    #[test]
    fn joint_mid_income() {
        let policy = WaitPolicy::default();
        // 180_000 * 1.2 * 3.0 = 648_000 -> capped
        assert_eq!(policy.budget_ms(30_000, true), 600_000);
        // 180_000 * (45_000 / 30_000) * 1.5 = 405_000
        assert_eq!(policy.budget_ms(45_000, false), 405_000);
    }

    #[test]
    fn budget_is_monotonic_in_income() {
        let policy = WaitPolicy::default();
        let mut last = 0;
        for income in (10_000..400_000).step_by(5_000) {
            let b = policy.budget_ms(income, false);
            assert!(b >= last);
            assert!(b <= policy.max_ms);
            last = b;
        }
    }

    #[test]
    fn stability_needs_three_unchanged_polls() {
        let mut tracker = WaitPolicy::default().tracker();
        assert!(!tracker.observe(obs(12, 20)));
        assert!(!tracker.observe(obs(12, 20)));
        assert!(tracker.observe(obs(12, 20)));
    }

    #[test]
    fn stability_resets_on_change() {
        let mut tracker = WaitPolicy::default().tracker();
        tracker.observe(obs(12, 20));
        tracker.observe(obs(12, 20));
        assert!(!tracker.observe(obs(13, 22)));
        assert_eq!(tracker.streak(), 1);
        tracker.observe(obs(13, 22));
        assert!(tracker.observe(obs(13, 22)));
    }

    #[test]
    fn stability_resets_below_thresholds() {
        let mut tracker = WaitPolicy::default().tracker();
        tracker.observe(obs(14, 20));
        tracker.observe(obs(14, 10));
        assert_eq!(tracker.streak(), 0);
        tracker.observe(obs(14, 20));
        tracker.observe(obs(14, 20));
        assert!(!tracker.is_loaded());
        assert!(tracker.observe(obs(14, 20)));
    }

    #[test]
    fn too_few_lenders_never_load() {
        let mut tracker = WaitPolicy::default().tracker();
        for _ in 0..10 {
            assert!(!tracker.observe(obs(11, 40)));
        }
    }
}
