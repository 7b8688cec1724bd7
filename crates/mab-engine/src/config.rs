//! Engine configuration
//!
//! Layered in increasing precedence: built-in defaults, an optional TOML
//! file, the process environment, then command-line flags (applied by the
//! binary through the `with_*` builders).
//!
//! ```toml
//! [portal]
//! base_url = "https://portal.example.co.uk"
//!
//! [browser]
//! headless = true
//!
//! [waiter]
//! initial_wait_ms = 60000
//!
//! [batch]
//! run_type = "credit"
//! accept_partials = false
//!
//! [store]
//! dir = "runs"
//! ```
//!
//! Credentials only ever come from `PORTAL_USERNAME` / `PORTAL_PASSWORD`.

use crate::error::ConfigError;
use mab_core::{RunType, SuccessPolicy, WaitPolicy};
use mab_portal::{parse_flag, BrowserSettings, Credentials, FieldWriterConfig, NavigatorConfig};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Portal addresses and navigation bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortalSection {
    pub base_url: String,
    pub sign_in_path: String,
    pub dashboard_path: String,
    pub max_steps: usize,
    pub modal_budget: usize,
}

impl Default for PortalSection {
    fn default() -> Self {
        let nav = NavigatorConfig::default();
        Self {
            base_url: nav.base_url,
            sign_in_path: nav.sign_in_path,
            dashboard_path: nav.dashboard_path,
            max_steps: nav.max_steps,
            modal_budget: nav.modal_budget,
        }
    }
}

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserSection {
    /// Forced headless mode; detected from the environment when unset
    pub headless: Option<bool>,
    /// Per-action slowdown; the mode default applies when unset
    pub slow_mo_ms: Option<u64>,
    pub action_timeout_ms: u64,
    pub executable: Option<PathBuf>,
    pub no_sandbox: bool,
    pub keystroke_delay_ms: u64,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            headless: None,
            slow_mo_ms: None,
            action_timeout_ms: 30_000,
            executable: None,
            no_sandbox: false,
            keystroke_delay_ms: 50,
        }
    }
}

/// Which scenarios run, and how results are judged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchSection {
    pub run_type: RunType,
    pub accept_partials: bool,
    pub min_lenders: usize,
    /// Retries per state transition for retryable driver errors
    pub transition_retries: u32,
    /// Replaces the embedded catalogue
    pub catalogue: Option<PathBuf>,
    /// Restrict to these scenario ids (catalogue order kept)
    pub scenarios: Vec<String>,
    pub limit: Option<usize>,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            run_type: RunType::Normal,
            accept_partials: false,
            min_lenders: SuccessPolicy::default().min_lenders,
            transition_retries: 1,
            catalogue: None,
            scenarios: Vec::new(),
            limit: None,
        }
    }
}

/// Where results and screenshots go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    pub dir: PathBuf,
    /// `None` disables screenshots
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("runs"),
            screenshot_dir: Some(PathBuf::from("screenshots")),
        }
    }
}

/// Environment facts used for headless detection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeEnv {
    pub app_env: Option<String>,
    pub ci: bool,
    pub has_display: bool,
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub portal: PortalSection,
    pub browser: BrowserSection,
    pub waiter: WaitPolicy,
    pub batch: BatchSection,
    pub store: StoreSection,
    #[serde(skip)]
    pub runtime: RuntimeEnv,
    #[serde(skip)]
    credentials: Option<Credentials>,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document (no environment applied)
    ///
    /// # Errors
    /// `toml::de::Error` for malformed documents or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Defaults, then `path`, then the process environment
    ///
    /// # Errors
    /// `ConfigError` for unreadable files or invalid values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// As [`EngineConfig::load`] with an explicit environment lookup
    ///
    /// # Errors
    /// `ConfigError` for unreadable files or invalid values.
    pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Self::default(),
        };
        config.apply_env(env)?;
        Ok(config)
    }

    /// Overlay process-environment settings
    ///
    /// # Errors
    /// `ConfigError::Invalid` for unparseable `RUN_MODE` or `HEADLESS`.
    pub fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        if let (Some(username), Some(password)) = (var("PORTAL_USERNAME"), var("PORTAL_PASSWORD")) {
            self.credentials = Some(Credentials::new(username, SecretString::from(password)));
        }
        if let Some(url) = var("PORTAL_BASE_URL") {
            self.portal.base_url = url;
        }
        if let Some(mode) = var("RUN_MODE") {
            self.batch.run_type = mode
                .parse()
                .map_err(|reason: String| ConfigError::invalid("RUN_MODE", mode.clone(), reason))?;
        }
        if let Some(flag) = var("HEADLESS") {
            let headless = parse_flag(&flag)
                .ok_or_else(|| ConfigError::invalid("HEADLESS", flag.clone(), "expected true/false"))?;
            self.browser.headless = Some(headless);
        }
        if let Some(dir) = env("SCREENSHOT_DIR") {
            let dir = dir.trim();
            self.store.screenshot_dir = (!dir.is_empty()).then(|| PathBuf::from(dir));
        }
        if let Some(dir) = var("RUN_STORE_DIR") {
            self.store.dir = PathBuf::from(dir);
        }

        self.runtime = RuntimeEnv {
            app_env: var("APP_ENV"),
            ci: var("CI").is_some_and(|v| parse_flag(&v) != Some(false)),
            has_display: !cfg!(target_os = "linux")
                || var("DISPLAY").is_some()
                || var("WAYLAND_DISPLAY").is_some(),
        };
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_run_type(mut self, run_type: RunType) -> Self {
        self.batch.run_type = run_type;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_accept_partials(mut self, accept: bool) -> Self {
        self.batch.accept_partials = accept;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.browser.headless = Some(headless);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_catalogue(mut self, path: PathBuf) -> Self {
        self.batch.catalogue = Some(path);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_scenarios(mut self, ids: Vec<String>) -> Self {
        self.batch.scenarios = ids;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.batch.limit = Some(limit);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_store_dir(mut self, dir: PathBuf) -> Self {
        self.store.dir = dir;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_screenshot_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.store.screenshot_dir = dir;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_waiter(mut self, waiter: WaitPolicy) -> Self {
        self.waiter = waiter;
        self
    }

    /// Portal credentials
    ///
    /// # Errors
    /// `ConfigError::Missing` when either variable is unset.
    pub fn credentials(&self) -> Result<&Credentials, ConfigError> {
        self.credentials
            .as_ref()
            .ok_or(ConfigError::Missing("PORTAL_USERNAME and PORTAL_PASSWORD"))
    }

    /// Check the settings a batch run depends on
    ///
    /// # Errors
    /// The first missing or unusable setting.
    pub fn validate_for_run(&self) -> Result<(), ConfigError> {
        self.credentials()?;
        let url = self.portal.base_url.trim();
        if url.is_empty() {
            return Err(ConfigError::Missing("PORTAL_BASE_URL"));
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::invalid("portal.base_url", url, "expected an http(s) URL"));
        }
        if self.portal.max_steps == 0 {
            return Err(ConfigError::invalid("portal.max_steps", "0", "must be positive"));
        }
        if self.browser.action_timeout_ms == 0 {
            return Err(ConfigError::invalid("browser.action_timeout_ms", "0", "must be positive"));
        }
        if self.waiter.poll_interval_ms == 0 {
            return Err(ConfigError::invalid("waiter.poll_interval_ms", "0", "must be positive"));
        }
        Ok(())
    }

    #[must_use]
    pub fn navigator_config(&self) -> NavigatorConfig {
        NavigatorConfig {
            base_url: self.portal.base_url.clone(),
            sign_in_path: self.portal.sign_in_path.clone(),
            dashboard_path: self.portal.dashboard_path.clone(),
            max_steps: self.portal.max_steps,
            modal_budget: self.portal.modal_budget,
        }
    }

    /// Whether the browser runs headless
    #[must_use]
    pub fn headless(&self) -> bool {
        self.browser.headless.unwrap_or_else(|| {
            mab_portal::detect_headless(
                None,
                self.runtime.app_env.as_deref(),
                self.runtime.ci,
                self.runtime.has_display,
            )
        })
    }

    /// Production settings when headless, development settings otherwise
    #[must_use]
    pub fn browser_settings(&self) -> BrowserSettings {
        let headless = self.headless();
        let mut settings = if headless {
            BrowserSettings::production()
        } else {
            BrowserSettings::development()
        }
        .with_action_timeout(Duration::from_millis(self.browser.action_timeout_ms))
        .with_executable(self.browser.executable.clone());
        if let Some(ms) = self.browser.slow_mo_ms {
            settings.slow_mo = (ms > 0).then(|| Duration::from_millis(ms));
        }
        settings.no_sandbox = self.browser.no_sandbox;
        settings
    }

    #[must_use]
    pub fn writer_config(&self) -> FieldWriterConfig {
        FieldWriterConfig {
            keystroke_delay: Duration::from_millis(self.browser.keystroke_delay_ms),
            ..FieldWriterConfig::default()
        }
    }

    #[must_use]
    pub fn success_policy(&self) -> SuccessPolicy {
        SuccessPolicy {
            min_lenders: self.batch.min_lenders,
            accept_partials: self.batch.accept_partials,
        }
    }
}
