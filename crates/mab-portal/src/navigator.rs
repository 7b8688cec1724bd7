//! Portal navigator
//!
//! Sign-in, case lookup on the dashboard, and the bounded walk through
//! the multi-step form to the income section. Modal dialogues are
//! treated as interruptions: after every submit the navigator clicks any
//! confirmation button, and repeated dialogues count towards a stall
//! budget.

use crate::error::PortalError;
use crate::locate;
use crate::page::{ElementRef, Key, PortalPage};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

/// Portal addresses and navigation bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigatorConfig {
    /// Origin, e.g. `https://portal.example.co.uk`
    pub base_url: String,
    pub sign_in_path: String,
    pub dashboard_path: String,
    /// Form steps before giving up on the income section
    pub max_steps: usize,
    /// Dialogues tolerated after a single action
    pub modal_budget: usize,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            sign_in_path: "/sign-in".to_string(),
            dashboard_path: "/cases".to_string(),
            max_steps: 15,
            modal_budget: 3,
        }
    }
}

impl NavigatorConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn sign_in_url(&self) -> String {
        join_url(&self.base_url, &self.sign_in_path)
    }

    #[must_use]
    pub fn dashboard_url(&self) -> String {
        join_url(&self.base_url, &self.dashboard_path)
    }

    /// Whether a URL is still on the sign-in path
    #[must_use]
    pub fn is_sign_in_url(&self, url: &str) -> bool {
        let prefix = self.sign_in_path.trim_end_matches('/');
        url_path(url)
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn url_path(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = without_scheme
        .find('/')
        .map_or("/", |i| &without_scheme[i..]);
    path.split(['?', '#']).next().unwrap_or(path)
}

/// Portal credentials
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

/// Navigation over one Portal tab
#[derive(Debug)]
pub struct PortalNavigator<'a, P: PortalPage + ?Sized> {
    page: &'a P,
    config: &'a NavigatorConfig,
}

impl<'a, P: PortalPage + ?Sized> PortalNavigator<'a, P> {
    #[must_use]
    pub fn new(page: &'a P, config: &'a NavigatorConfig) -> Self {
        Self { page, config }
    }

    /// Sign in and verify the Portal left the sign-in path
    ///
    /// # Errors
    /// `PortalError::Login` when the form is missing or sign-in is refused.
    pub async fn login(&self, credentials: &Credentials) -> Result<(), PortalError> {
        let url = self.config.sign_in_url();
        self.page.goto(&url).await?;
        self.page.wait_for_idle().await?;

        let inputs = self.page.inputs().await?;
        let (email, password) = locate::find_login_inputs(&inputs)
            .ok_or_else(|| PortalError::Login("sign-in form not found".into()))?;
        let (email, password) = (email.element.clone(), password.element.clone());

        self.type_aggressively(&email, &credentials.username).await?;
        self.type_aggressively(&password, credentials.password.expose_secret())
            .await?;

        let controls = self.page.controls().await?;
        match locate::find_sign_in_submit(&controls) {
            Some(submit) => self.page.click(&submit.element).await?,
            None => self.page.press_key(&password, Key::Enter).await?,
        }
        self.page.wait_for_idle().await?;
        self.dismiss_dialogs("sign-in").await?;

        let landed = self.page.current_url().await?;
        if self.config.is_sign_in_url(&landed) {
            return Err(PortalError::Login(format!("still on sign-in page ({landed})")));
        }
        info!(url = %landed, "Signed in");
        Ok(())
    }

    /// Whether the session is still signed in (navigates to the dashboard)
    ///
    /// # Errors
    /// Driver errors only.
    pub async fn is_signed_in(&self) -> Result<bool, PortalError> {
        self.page.goto(&self.config.dashboard_url()).await?;
        self.page.wait_for_idle().await?;
        let url = self.page.current_url().await?;
        Ok(!self.config.is_sign_in_url(&url))
    }

    /// Re-authenticate when the Portal bounced back to sign-in
    ///
    /// # Errors
    /// `PortalError::Login` if re-authentication fails.
    pub async fn ensure_signed_in(&self, credentials: &Credentials) -> Result<(), PortalError> {
        if self.is_signed_in().await? {
            return Ok(());
        }
        warn!("Session expired; signing in again");
        self.login(credentials).await
    }

    /// Open the case whose dashboard row carries `case_ref`
    ///
    /// # Errors
    /// `PortalError::CaseNotFound` if no row matches.
    pub async fn open_case(&self, case_ref: &str) -> Result<(), PortalError> {
        self.page.goto(&self.config.dashboard_url()).await?;
        self.page.wait_for_idle().await?;
        self.dismiss_dialogs("dashboard").await?;

        let mut row = locate::find_case_row(&self.page.controls().await?, case_ref)
            .map(|c| c.element.clone());
        if row.is_none() {
            // lazily rendered lists
            self.page.scroll_to_bottom().await?;
            self.page.wait_for_idle().await?;
            row = locate::find_case_row(&self.page.controls().await?, case_ref)
                .map(|c| c.element.clone());
        }
        let row = row.ok_or_else(|| PortalError::CaseNotFound(case_ref.to_string()))?;

        self.page.click(&row).await?;
        self.page.wait_for_idle().await?;
        self.dismiss_dialogs("open case").await?;
        info!(case_ref, "Case opened");
        Ok(())
    }

    /// Walk the form until income markers show
    ///
    /// Returns the number of steps taken.
    ///
    /// # Errors
    /// `PortalError::NavigationStalled` when the bound is hit or no
    /// control moves the form forward.
    pub async fn advance_to_income_section(&self) -> Result<usize, PortalError> {
        for step in 0..self.config.max_steps {
            let text = self.page.page_text().await?;
            if locate::has_income_markers(&text) {
                info!(steps = step, "Reached income section");
                return Ok(step);
            }

            let controls = self.page.controls().await?;
            let Some(next) = locate::find_advance_control(&controls) else {
                return Err(PortalError::NavigationStalled {
                    steps: step,
                    reason: "no next/continue/save control".into(),
                });
            };
            debug!(step, control = %next.text, "Advancing form");
            let next = next.element.clone();
            self.page.click(&next).await?;
            self.page.wait_for_idle().await?;
            self.dismiss_dialogs("advance").await?;
        }

        Err(PortalError::NavigationStalled {
            steps: self.config.max_steps,
            reason: "income section markers never appeared".into(),
        })
    }

    /// Click through confirmation dialogues raised by the last action
    ///
    /// Returns how many were dismissed.
    ///
    /// # Errors
    /// `PortalError::NavigationStalled` once dialogues exceed the budget.
    pub async fn dismiss_dialogs(&self, after: &str) -> Result<usize, PortalError> {
        let mut dismissed = 0;
        loop {
            let controls = self.page.controls().await?;
            let Some(confirm) = locate::find_dialog_confirm(&controls) else {
                return Ok(dismissed);
            };
            if dismissed >= self.config.modal_budget {
                return Err(PortalError::NavigationStalled {
                    steps: dismissed,
                    reason: format!("dialogues keep reappearing after {after}"),
                });
            }
            debug!(after, button = %confirm.text, "Dismissing dialogue");
            let confirm = confirm.element.clone();
            self.page.click(&confirm).await?;
            self.page.wait_for_idle().await?;
            dismissed += 1;
        }
    }

    /// Clear an input thoroughly and type `text`
    async fn type_aggressively(&self, element: &ElementRef, text: &str) -> Result<(), PortalError> {
        self.page.focus(element).await?;
        self.page.select_all(element).await?;
        self.page.press_key(element, Key::Delete).await?;
        self.page.native_clear(element).await?;
        for ch in text.chars() {
            self.page.type_char(element, ch).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_join_cleanly() {
        let config = NavigatorConfig::new("https://portal.example.co.uk/");
        assert_eq!(config.sign_in_url(), "https://portal.example.co.uk/sign-in");
        assert_eq!(config.dashboard_url(), "https://portal.example.co.uk/cases");
    }

    #[test]
    fn sign_in_detection_uses_path() {
        let config = NavigatorConfig::new("https://portal.example.co.uk");
        assert!(config.is_sign_in_url("https://portal.example.co.uk/sign-in?next=%2Fcases"));
        assert!(config.is_sign_in_url("https://portal.example.co.uk/sign-in/"));
        assert!(!config.is_sign_in_url("https://portal.example.co.uk/cases"));
        assert!(!config.is_sign_in_url("https://portal.example.co.uk/"));
        assert!(!config.is_sign_in_url("https://portal.example.co.uk/sign-in-help"));
        assert!(config.is_sign_in_url("https://portal.example.co.uk/sign-in#form"));
    }

    #[test]
    fn url_path_extraction() {
        assert_eq!(url_path("https://a.b/c/d?x=1#y"), "/c/d");
        assert_eq!(url_path("https://a.b"), "/");
        assert_eq!(url_path("/relative#frag"), "/relative");
    }
}
