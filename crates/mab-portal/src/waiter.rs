//! Results waiter
//!
//! Sleeps the mandatory initial wait, then polls page text at a fixed
//! interval until the stability rule reports the panel loaded or the
//! scenario's budget runs out. Running out is not an error: the report
//! carries a `Partial` verdict and extraction proceeds.

use crate::error::PortalError;
use crate::page::PortalPage;
use mab_core::{count_sigils, LenderPanel, PollObservation, Scenario, WaitPolicy, WaitReport, WaitVerdict};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Wait for the results panel to populate
///
/// The budget includes the initial wait.
///
/// # Errors
/// Driver errors while reading the page.
pub async fn wait_for_results<P: PortalPage + ?Sized>(
    page: &P,
    policy: &WaitPolicy,
    scenario: &Scenario,
    panel: &LenderPanel,
) -> Result<WaitReport, PortalError> {
    let budget = policy.budget_for(scenario);
    let started = Instant::now();
    let deadline = started + budget;
    info!(
        budget_ms = millis(budget),
        initial_wait_ms = policy.initial_wait_ms,
        poll_interval_ms = policy.poll_interval_ms,
        "Waiting for results"
    );

    tokio::time::sleep(policy.initial_wait().min(budget)).await;

    let mut tracker = policy.tracker();
    let mut polls = 0u32;
    let mut last: PollObservation;
    let mut verdict = WaitVerdict::Partial;

    loop {
        let text = page.page_text().await?;
        last = PollObservation {
            lenders: panel.lenders_in_text(&text).len(),
            sigils: count_sigils(&text),
        };
        polls += 1;
        let loaded = tracker.observe(last);
        debug!(
            poll = polls,
            lenders = last.lenders,
            sigils = last.sigils,
            streak = tracker.streak(),
            "Results poll"
        );
        if loaded {
            verdict = WaitVerdict::Loaded;
            break;
        }

        let now = Instant::now();
        if now >= deadline {
            break;
        }
        tokio::time::sleep(policy.poll_interval().min(deadline - now)).await;
    }

    let report = WaitReport {
        budget_ms: millis(budget),
        elapsed_ms: millis(started.elapsed()),
        polls,
        verdict,
        last_lender_count: last.lenders,
        last_sigil_count: last.sigils,
    };
    match verdict {
        WaitVerdict::Loaded => info!(
            polls,
            elapsed_ms = report.elapsed_ms,
            lenders = last.lenders,
            "Results loaded"
        ),
        WaitVerdict::Partial => warn!(
            polls,
            elapsed_ms = report.elapsed_ms,
            lenders = last.lenders,
            sigils = last.sigils,
            "Wait budget exhausted; results partial"
        ),
    }
    Ok(report)
}

fn millis(d: std::time::Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
