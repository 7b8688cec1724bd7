//! Batch runner
//!
//! One browser context and one sign-in per batch. Scenarios run strictly
//! one after another; each record is persisted before the next scenario
//! starts, and a run summary is written however the batch ends. A sign-in
//! lost mid-batch gets one fresh context before the batch is abandoned.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::executor::{ExecutorSettings, ScenarioExecutor};
use chrono::Utc;
use mab_core::{
    Catalogue, RunSummary, RunTally, RunType, Scenario, ScenarioFilter, ScenarioId,
    ScenarioRecord, SessionId,
};
use mab_portal::{
    BrowserSession, BrowserSettings, Credentials, PortalError, PortalNavigator, PortalPage,
    ScreenshotSink,
};
use mab_store::RunStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn, Instrument};

/// A page plus whatever keeps it alive
pub struct PortalContext {
    pub page: Box<dyn PortalPage>,
    session: Option<BrowserSession>,
}

impl PortalContext {
    /// Context around a page that owns nothing else
    #[must_use]
    pub fn new(page: Box<dyn PortalPage>) -> Self {
        Self { page, session: None }
    }

    #[must_use]
    pub fn with_session(page: Box<dyn PortalPage>, session: BrowserSession) -> Self {
        Self {
            page,
            session: Some(session),
        }
    }

    /// Release the tab and browser; failures are only logged
    pub async fn close(self) {
        if let Err(e) = self.page.close().await {
            debug!(error = %e, "Tab did not close cleanly");
        }
        if let Some(session) = self.session {
            if let Err(e) = session.close().await {
                warn!(error = %e, "Browser did not close cleanly");
            }
        }
    }
}

/// Creates fresh, isolated browser contexts
#[async_trait::async_trait]
pub trait PortalLauncher: Send + Sync {
    /// # Errors
    /// `PortalError::BrowserStartup` when no context can be created.
    async fn launch(&self) -> Result<PortalContext, PortalError>;
}

/// Launches a Chromium browser per context
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    settings: BrowserSettings,
}

impl ChromiumLauncher {
    #[must_use]
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl PortalLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<PortalContext, PortalError> {
        let session = BrowserSession::launch(self.settings.clone()).await?;
        let page = session.open_page().await?;
        Ok(PortalContext::with_session(Box::new(page), session))
    }
}

/// How a batch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEnd {
    /// Every selected scenario produced a record
    Completed,
    /// Operator interrupt observed between scenarios
    Cancelled,
    /// Browser start-up or sign-in failed
    Fatal(String),
}

impl BatchEnd {
    fn aborted_reason(&self) -> Option<String> {
        match self {
            Self::Completed => None,
            Self::Cancelled => Some("cancelled by operator".to_string()),
            Self::Fatal(reason) => Some(reason.clone()),
        }
    }
}

/// Records, summary and ending of one batch
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub session_id: SessionId,
    pub records: Vec<ScenarioRecord>,
    pub summary: RunSummary,
    pub end: BatchEnd,
}

impl BatchOutcome {
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self.end, BatchEnd::Fatal(_))
    }
}

/// Runs a list of scenarios against the Portal
pub struct BatchRunner<L: PortalLauncher> {
    launcher: L,
    store: Arc<dyn RunStore>,
    settings: ExecutorSettings,
    credentials: Credentials,
    run_type: RunType,
    screenshot_dir: Option<PathBuf>,
}

impl<L: PortalLauncher> BatchRunner<L> {
    #[must_use]
    pub fn new(
        launcher: L,
        store: Arc<dyn RunStore>,
        settings: ExecutorSettings,
        credentials: Credentials,
    ) -> Self {
        Self {
            launcher,
            store,
            settings,
            credentials,
            run_type: RunType::default(),
            screenshot_dir: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_run_type(mut self, run_type: RunType) -> Self {
        self.run_type = run_type;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_screenshot_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.screenshot_dir = dir;
        self
    }

    /// Run `scenarios` in order until done, cancelled or a fatal error
    ///
    /// `cancel` is checked between scenarios; a scenario in flight always
    /// finishes and is recorded.
    ///
    /// # Errors
    /// `EngineError::Store` when a record or the summary cannot be written.
    pub async fn run(
        &self,
        scenarios: &[Scenario],
        cancel: watch::Receiver<bool>,
    ) -> Result<BatchOutcome, EngineError> {
        let session_id = SessionId::new();
        let span = tracing::info_span!(
            "batch",
            session_id = %session_id,
            run_type = %self.run_type,
        );
        self.run_session(session_id, scenarios, cancel)
            .instrument(span)
            .await
    }

    async fn run_session(
        &self,
        session_id: SessionId,
        scenarios: &[Scenario],
        cancel: watch::Receiver<bool>,
    ) -> Result<BatchOutcome, EngineError> {
        let started_at = Utc::now();
        let mut tally = RunTally::new();
        let mut records = Vec::with_capacity(scenarios.len());
        info!(scenarios = scenarios.len(), "Batch starting");

        let mut context = None;
        let end = match self.start().await {
            Ok(started) => {
                context = Some(started);
                self.run_scenarios(session_id, &mut context, scenarios, &cancel, &mut tally, &mut records)
                    .await
            }
            Err(e) => {
                warn!(error = %e, "Batch could not start");
                Ok(BatchEnd::Fatal(e.to_string()))
            }
        };
        let end = match end {
            Ok(end) => end,
            Err(e) => {
                if let Some(context) = context {
                    context.close().await;
                }
                return Err(e);
            }
        };

        let summary = tally.summary(session_id, self.run_type, started_at, end.aborted_reason());
        let stored = self.store.append_summary(&summary).await;
        if let Some(context) = context {
            context.close().await;
        }
        stored?;

        info!(
            total = summary.total_scenarios,
            successful = summary.successful_scenarios,
            average_gen_h_rank = summary.average_gen_h_rank,
            aborted = summary.is_aborted(),
            "Batch finished"
        );
        Ok(BatchOutcome {
            session_id,
            records,
            summary,
            end,
        })
    }

    /// `context` is replaced when a fresh one is needed and left `None`
    /// when none could be had.
    async fn run_scenarios(
        &self,
        session_id: SessionId,
        context: &mut Option<PortalContext>,
        scenarios: &[Scenario],
        cancel: &watch::Receiver<bool>,
        tally: &mut RunTally,
        records: &mut Vec<ScenarioRecord>,
    ) -> Result<BatchEnd, EngineError> {
        let screenshots = ScreenshotSink::new(self.screenshot_dir.clone(), session_id);
        let executor =
            ScenarioExecutor::new(session_id, &self.settings, &self.credentials, &screenshots);

        for (index, scenario) in scenarios.iter().enumerate() {
            if *cancel.borrow() {
                info!(remaining = scenarios.len() - index, "Cancellation requested");
                return Ok(BatchEnd::Cancelled);
            }
            info!(
                position = index + 1,
                of = scenarios.len(),
                scenario_id = %scenario.id,
                "Scenario starting"
            );
            let Some(current) = context.as_ref() else {
                return Ok(BatchEnd::Fatal("no browser context".into()));
            };
            let abort = match executor.run(current.page.as_ref(), scenario).await {
                Ok(record) => {
                    self.persist(record, tally, records).await?;
                    continue;
                }
                Err(abort) => abort,
            };

            warn!(error = %abort.error, "Batch-fatal Portal failure; retrying in a fresh browser context");
            if let Some(stale) = context.take() {
                stale.close().await;
            }
            let fresh = match self.launch_and_sign_in().await {
                Ok(fresh) => context.insert(fresh),
                Err(e) => {
                    warn!(error = %e, "Fresh browser context failed");
                    self.persist(abort.record, tally, records).await?;
                    return Ok(BatchEnd::Fatal(e.to_string()));
                }
            };
            match executor.run(fresh.page.as_ref(), scenario).await {
                Ok(record) => self.persist(record, tally, records).await?,
                Err(again) => {
                    warn!(error = %again.error, "Batch-fatal Portal failure after a fresh context");
                    self.persist(again.record, tally, records).await?;
                    return Ok(BatchEnd::Fatal(again.error.to_string()));
                }
            }
        }
        Ok(BatchEnd::Completed)
    }

    async fn persist(
        &self,
        record: ScenarioRecord,
        tally: &mut RunTally,
        records: &mut Vec<ScenarioRecord>,
    ) -> Result<(), EngineError> {
        self.store.append_scenario(&record).await?;
        tally.record(&record);
        records.push(record);
        Ok(())
    }

    /// Launch and sign in, retrying once in a fresh context
    async fn start(&self) -> Result<PortalContext, PortalError> {
        match self.launch_and_sign_in().await {
            Ok(context) => Ok(context),
            Err(e) => {
                warn!(error = %e, "Start-up failed; retrying in a fresh browser context");
                self.launch_and_sign_in().await
            }
        }
    }

    async fn launch_and_sign_in(&self) -> Result<PortalContext, PortalError> {
        let context = self.launcher.launch().await?;
        let nav = PortalNavigator::new(context.page.as_ref(), &self.settings.navigator);
        match nav.login(&self.credentials).await {
            Ok(()) => Ok(context),
            Err(e) => {
                context.close().await;
                Err(e)
            }
        }
    }
}

/// Scenarios a configuration selects, in catalogue order
///
/// # Errors
/// `EngineError::Catalogue` for an unreadable catalogue or an unknown id.
pub fn select_scenarios(config: &EngineConfig) -> Result<Vec<Scenario>, EngineError> {
    let catalogue = match &config.batch.catalogue {
        Some(path) => Catalogue::load(path)?,
        None => Catalogue::embedded()?,
    };
    let filter = ScenarioFilter::new(config.batch.run_type)
        .with_ids(config.batch.scenarios.iter().map(ScenarioId::new))
        .with_limit(config.batch.limit);
    Ok(catalogue.select(&filter)?)
}

/// Executor settings derived from a configuration
#[must_use]
pub fn executor_settings(config: &EngineConfig) -> ExecutorSettings {
    ExecutorSettings::new(config.navigator_config())
        .with_writer(config.writer_config())
        .with_waiter(config.waiter)
        .with_success(config.success_policy())
        .with_transition_retries(config.batch.transition_retries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_follows_config() {
        let config = EngineConfig::default().with_limit(3);
        let selected = select_scenarios(&config).unwrap();
        assert_eq!(selected.len(), 3);
        assert!(selected.iter().all(|s| !s.case_kind.has_credit_commitments()));

        let config = EngineConfig::default().with_run_type(RunType::Credit);
        let selected = select_scenarios(&config).unwrap();
        assert!(selected.iter().all(|s| s.case_kind.has_credit_commitments()));
    }

    #[test]
    fn unknown_scenario_id_is_rejected() {
        let config = EngineConfig::default().with_scenarios(vec!["NOPE-001k".into()]);
        assert!(matches!(
            select_scenarios(&config),
            Err(EngineError::Catalogue(_))
        ));
    }

    #[test]
    fn settings_carry_config_values() {
        let config = EngineConfig::default().with_accept_partials(true);
        let settings = executor_settings(&config);
        assert!(settings.success.accept_partials);
        assert_eq!(settings.transition_retries, 1);
        assert_eq!(settings.navigator.max_steps, 15);
    }

    #[test]
    fn aborted_reasons() {
        assert_eq!(BatchEnd::Completed.aborted_reason(), None);
        assert_eq!(
            BatchEnd::Cancelled.aborted_reason().as_deref(),
            Some("cancelled by operator")
        );
        assert_eq!(
            BatchEnd::Fatal("sign-in rejected".into()).aborted_reason().as_deref(),
            Some("sign-in rejected")
        );
    }
}
