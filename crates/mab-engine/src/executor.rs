//! Scenario executor
//!
//! Drives one scenario through the state machine:
//! sign-in check, case lookup, income section, income and credit writes,
//! a single recomputation, the results wait and extraction. Every
//! scenario ends in a record; a batch-fatal Portal error comes back as a
//! `ScenarioAbort` carrying both the error and the FAILED record.

use crate::retry::with_retries;
use mab_core::{
    plan_income, Extraction, FailureKind, FailureRecord, IncomePlan, LenderPanel, Scenario,
    ScenarioProgress, ScenarioRecord, ScenarioState, SessionId, SuccessPolicy, WaitPolicy,
    WaitReport,
};
use mab_portal::{
    extract_results, trigger_recompute, wait_for_results, write_credit, write_income,
    Credentials, FieldWriter, FieldWriterConfig, NavigatorConfig, PortalError, PortalNavigator,
    PortalPage, ScreenshotSink, Waypoint,
};
use tracing::{debug, info, warn, Instrument};

/// Everything the executor needs besides the page and the scenario
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub navigator: NavigatorConfig,
    pub writer: FieldWriterConfig,
    pub waiter: WaitPolicy,
    pub success: SuccessPolicy,
    /// Extra attempts for a transition hit by a retryable driver error
    pub transition_retries: u32,
}

impl ExecutorSettings {
    #[must_use]
    pub fn new(navigator: NavigatorConfig) -> Self {
        Self {
            navigator,
            writer: FieldWriterConfig::default(),
            waiter: WaitPolicy::default(),
            success: SuccessPolicy::default(),
            transition_retries: 1,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_writer(mut self, writer: FieldWriterConfig) -> Self {
        self.writer = writer;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_waiter(mut self, waiter: WaitPolicy) -> Self {
        self.waiter = waiter;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_success(mut self, success: SuccessPolicy) -> Self {
        self.success = success;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_transition_retries(mut self, retries: u32) -> Self {
        self.transition_retries = retries;
        self
    }
}

/// A scenario stopped by a batch-fatal Portal error
#[derive(Debug, Clone)]
pub struct ScenarioAbort {
    pub error: PortalError,
    /// FAILED record at the last good state
    pub record: ScenarioRecord,
}

/// What a completed run of the state machine produced
struct Harvest {
    extraction: Extraction,
    wait: WaitReport,
    stale: bool,
}

/// Runs scenarios for one batch session
pub struct ScenarioExecutor<'a> {
    session_id: SessionId,
    settings: &'a ExecutorSettings,
    credentials: &'a Credentials,
    screenshots: &'a ScreenshotSink,
    panel: &'a LenderPanel,
    writer: FieldWriter,
}

impl<'a> ScenarioExecutor<'a> {
    #[must_use]
    pub fn new(
        session_id: SessionId,
        settings: &'a ExecutorSettings,
        credentials: &'a Credentials,
        screenshots: &'a ScreenshotSink,
    ) -> Self {
        Self {
            session_id,
            settings,
            credentials,
            screenshots,
            panel: LenderPanel::standard(),
            writer: FieldWriter::new(settings.writer),
        }
    }

    /// Execute one scenario and return its record
    ///
    /// # Errors
    /// `ScenarioAbort` for batch-fatal Portal errors (browser start-up,
    /// sign-in).
    pub async fn run<P: PortalPage + ?Sized>(
        &self,
        page: &P,
        scenario: &Scenario,
    ) -> Result<ScenarioRecord, ScenarioAbort> {
        let span = tracing::info_span!(
            "scenario",
            scenario_id = %scenario.id,
            case_kind = %scenario.case_kind,
        );
        self.run_inner(page, scenario).instrument(span).await
    }

    async fn run_inner<P: PortalPage + ?Sized>(
        &self,
        page: &P,
        scenario: &Scenario,
    ) -> Result<ScenarioRecord, ScenarioAbort> {
        let mut progress = ScenarioProgress::new();

        let plan = match plan_income(scenario.case_kind, scenario.total_income) {
            Ok(plan) => plan,
            Err(e) => {
                progress.fail();
                warn!(error = %e, "Income plan rejected");
                return Ok(ScenarioRecord::failed(
                    self.session_id,
                    scenario,
                    FailureRecord::new(
                        FailureKind::FieldWriteMismatch,
                        format!("income plan rejected: {e}"),
                        progress.last_good_state(),
                    ),
                ));
            }
        };
        for line in plan.audit_lines() {
            info!(plan = %line, "Income plan");
        }

        let outcome = self.drive(page, scenario, &plan, &mut progress).await;
        self.return_to_dashboard(page).await;

        match outcome {
            Ok(harvest) => {
                let record = ScenarioRecord::extracted(
                    self.session_id,
                    scenario,
                    harvest.extraction,
                    harvest.wait,
                    harvest.stale,
                    self.settings.success,
                );
                info!(
                    lenders = record.lender_count(),
                    gen_h_rank = record.gen_h_rank(),
                    coverage = ?record.coverage,
                    successful = record.successful,
                    "Scenario extracted"
                );
                Ok(record)
            }
            Err(e) => {
                progress.fail();
                let state = progress.last_good_state();
                warn!(error = %e, kind = %e.failure_kind(), %state, "Scenario failed");
                let record = ScenarioRecord::failed(
                    self.session_id,
                    scenario,
                    FailureRecord::new(e.failure_kind(), e.to_string(), state),
                );
                if e.is_batch_fatal() {
                    Err(ScenarioAbort { error: e, record })
                } else {
                    Ok(record)
                }
            }
        }
    }

    async fn drive<P: PortalPage + ?Sized>(
        &self,
        page: &P,
        scenario: &Scenario,
        plan: &IncomePlan,
        progress: &mut ScenarioProgress,
    ) -> Result<Harvest, PortalError> {
        let retries = self.settings.transition_retries;
        let nav = PortalNavigator::new(page, &self.settings.navigator);

        with_retries("sign_in", retries, || nav.ensure_signed_in(self.credentials)).await?;
        advance(progress, ScenarioState::LoggedIn)?;

        let case_ref = scenario.case_ref.as_str();
        with_retries("open_case", retries, || nav.open_case(case_ref)).await?;
        advance(progress, ScenarioState::CaseOpened)?;

        with_retries("income_section", retries, || nav.advance_to_income_section()).await?;
        advance(progress, ScenarioState::AtIncome)?;
        self.capture(page, scenario, Waypoint::BeforeIncome).await;

        let written =
            with_retries("write_income", retries, || write_income(page, &self.writer, plan))
                .await?;
        debug!(fields = written.len(), "Income written");
        advance(progress, ScenarioState::IncomeWritten)?;
        self.capture(page, scenario, Waypoint::AfterIncome).await;

        if let Some(credit) = &plan.credit {
            with_retries("write_credit", retries, || write_credit(page, &self.writer, credit))
                .await?;
            advance(progress, ScenarioState::CreditWritten)?;
        }

        self.capture(page, scenario, Waypoint::BeforeRecompute).await;
        // exactly one click: no retry around the trigger
        let triggered = trigger_recompute(page).await?;
        let stale = !triggered;
        if stale {
            warn!("No recomputation control; results may be stale");
        }
        advance(progress, ScenarioState::Recomputed)?;

        let wait = wait_for_results(page, &self.settings.waiter, scenario, self.panel).await?;
        advance(progress, ScenarioState::ResultsReady)?;
        self.capture(page, scenario, Waypoint::AtExtraction).await;

        let extraction =
            with_retries("extract", retries, || extract_results(page, self.panel)).await?;
        advance(progress, ScenarioState::Extracted)?;

        Ok(Harvest {
            extraction,
            wait,
            stale,
        })
    }

    async fn capture<P: PortalPage + ?Sized>(&self, page: &P, scenario: &Scenario, waypoint: Waypoint) {
        self.screenshots.capture(page, &scenario.id, waypoint).await;
    }

    async fn return_to_dashboard<P: PortalPage + ?Sized>(&self, page: &P) {
        let url = self.settings.navigator.dashboard_url();
        if let Err(e) = page.goto(&url).await {
            debug!(error = %e, "Could not return to dashboard");
        }
    }
}

fn advance(progress: &mut ScenarioProgress, to: ScenarioState) -> Result<(), PortalError> {
    let from = progress.state();
    progress
        .advance(to)
        .map_err(|e| PortalError::Driver(e.to_string()))?;
    debug!(%from, %to, "Transition");
    Ok(())
}
