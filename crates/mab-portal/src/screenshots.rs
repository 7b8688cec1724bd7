//! Waypoint screenshots
//!
//! Kept for diagnosing Portal UI changes after the fact. A failed capture
//! is logged and otherwise ignored.

use crate::page::PortalPage;
use mab_core::{ScenarioId, SessionId};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Points in the pipeline where a screenshot is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Waypoint {
    BeforeIncome,
    AfterIncome,
    BeforeRecompute,
    AtExtraction,
}

impl Waypoint {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Waypoint::BeforeIncome => "before-income",
            Waypoint::AfterIncome => "after-income",
            Waypoint::BeforeRecompute => "before-recompute",
            Waypoint::AtExtraction => "at-extraction",
        }
    }
}

impl fmt::Display for Waypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writes `<dir>/<session_id>/<scenario_id>-<waypoint>.png`
#[derive(Debug, Clone)]
pub struct ScreenshotSink {
    dir: Option<PathBuf>,
    session_id: SessionId,
}

impl ScreenshotSink {
    #[must_use]
    pub fn new(dir: Option<PathBuf>, session_id: SessionId) -> Self {
        Self { dir, session_id }
    }

    /// Sink that never captures
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None, SessionId::new())
    }

    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Target path for a waypoint, if capturing is enabled
    #[must_use]
    pub fn path_for(&self, scenario: &ScenarioId, waypoint: Waypoint) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| {
            dir.join(self.session_id.to_string())
                .join(format!("{scenario}-{waypoint}.png"))
        })
    }

    /// Capture a waypoint; returns the written path on success
    pub async fn capture<P: PortalPage + ?Sized>(
        &self,
        page: &P,
        scenario: &ScenarioId,
        waypoint: Waypoint,
    ) -> Option<PathBuf> {
        let path = self.path_for(scenario, waypoint)?;
        if let Err(e) = ensure_parent(&path).await {
            warn!(path = %path.display(), error = %e, "Cannot create screenshot directory");
            return None;
        }
        match page.screenshot(&path).await {
            Ok(()) => {
                debug!(%waypoint, path = %path.display(), "Screenshot saved");
                Some(path)
            }
            Err(e) => {
                warn!(%waypoint, error = %e, "Screenshot failed");
                None
            }
        }
    }
}

async fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) => tokio::fs::create_dir_all(parent).await,
        None => Ok(()),
    }
}
