//! Browser session
//!
//! One isolated Chromium instance per batch, with a throwaway profile
//! directory. Dropping the session aborts the CDP handler, kills the
//! browser process and removes the profile, so it is released on every
//! exit path.

use crate::chromium::ChromiumPage;
use crate::error::PortalError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info};

/// Launch settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Pause before every Portal call (development aid)
    pub slow_mo: Option<Duration>,
    /// Bound on every single Portal call
    pub action_timeout: Duration,
    /// Explicit Chrome/Chromium binary; auto-detected when `None`
    pub executable: Option<PathBuf>,
    pub window_size: (u32, u32),
    /// Pass `--no-sandbox` (containers)
    pub no_sandbox: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            slow_mo: None,
            action_timeout: Duration::from_secs(30),
            executable: None,
            window_size: (1440, 1000),
            no_sandbox: false,
        }
    }
}

impl BrowserSettings {
    /// Production: headless, no slowdown
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Development: visible window with a per-action slowdown
    #[must_use]
    pub fn development() -> Self {
        Self {
            headless: false,
            slow_mo: Some(Duration::from_millis(150)),
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_executable(mut self, path: Option<PathBuf>) -> Self {
        self.executable = path;
        self
    }
}

/// Parse a boolean environment flag (`1/true/yes`, `0/false/no`)
#[must_use]
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Decide headless mode from the environment
///
/// An explicit `HEADLESS` value wins; otherwise headless in production,
/// in CI, or when no display is available.
#[must_use]
pub fn detect_headless(
    headless_override: Option<&str>,
    app_env: Option<&str>,
    ci: bool,
    has_display: bool,
) -> bool {
    if let Some(explicit) = headless_override.and_then(parse_flag) {
        return explicit;
    }
    let production = app_env.is_some_and(|env| env.eq_ignore_ascii_case("production"));
    production || ci || !has_display
}

/// A launched browser owning its CDP handler task
pub struct BrowserSession {
    browser: Browser,
    handler_task: tokio::task::JoinHandle<()>,
    settings: BrowserSettings,
    _profile: TempDir,
}

impl std::fmt::Debug for BrowserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserSession")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

impl BrowserSession {
    /// Launch an isolated browser
    ///
    /// # Errors
    /// `PortalError::BrowserStartup` when the driver cannot launch.
    pub async fn launch(settings: BrowserSettings) -> Result<Self, PortalError> {
        let profile = tempfile::Builder::new()
            .prefix("mab-profile-")
            .tempdir()
            .map_err(|e| PortalError::BrowserStartup(format!("profile dir: {e}")))?;

        let (width, height) = settings.window_size;
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile.path())
            .window_size(width, height)
            .request_timeout(settings.action_timeout)
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        if !settings.headless {
            builder = builder.with_head();
        }
        if settings.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &settings.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(PortalError::BrowserStartup)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| PortalError::BrowserStartup(e.to_string()))?;
        let handler_task = tokio::spawn(async move { while (handler.next().await).is_some() {} });

        info!(
            headless = settings.headless,
            slow_mo_ms = settings.slow_mo.map(|d| d.as_millis()),
            "Browser launched"
        );
        Ok(Self {
            browser,
            handler_task,
            settings,
            _profile: profile,
        })
    }

    /// Open a fresh tab
    ///
    /// # Errors
    /// `PortalError::BrowserStartup` if the tab cannot be created.
    pub async fn open_page(&self) -> Result<ChromiumPage, PortalError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| PortalError::BrowserStartup(format!("new page: {e}")))?;
        Ok(ChromiumPage::new(
            page,
            self.settings.action_timeout,
            self.settings.slow_mo,
        ))
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &BrowserSettings {
        &self.settings
    }

    /// Close the browser and wait for the process to exit
    ///
    /// # Errors
    /// Driver errors while closing; the process is killed on drop regardless.
    pub async fn close(mut self) -> Result<(), PortalError> {
        self.browser.close().await?;
        if let Err(e) = self.browser.wait().await {
            debug!(error = %e, "Browser wait after close failed");
        }
        info!("Browser closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_override_wins() {
        assert!(detect_headless(Some("true"), None, false, true));
        assert!(!detect_headless(Some("0"), Some("production"), true, false));
    }

    #[test]
    fn environment_detection() {
        assert!(detect_headless(None, Some("production"), false, true));
        assert!(detect_headless(None, None, true, true));
        assert!(detect_headless(None, None, false, false));
        assert!(!detect_headless(None, Some("development"), false, true));
        // unparseable override falls through
        assert!(!detect_headless(Some("maybe"), None, false, true));
    }

    #[test]
    fn modes() {
        let dev = BrowserSettings::development();
        assert!(!dev.headless);
        assert_eq!(dev.slow_mo, Some(Duration::from_millis(150)));
        let prod = BrowserSettings::production();
        assert!(prod.headless);
        assert_eq!(prod.slow_mo, None);
        assert_eq!(prod.action_timeout, Duration::from_secs(30));
    }

    #[test]
    fn flags() {
        assert_eq!(parse_flag(" YES "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag(""), None);
    }
}
