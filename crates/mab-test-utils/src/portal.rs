//! Scripted in-memory Portal
//!
//! `FakePortal` implements `PortalPage` over a small state machine that
//! mimics the parts of the broker Portal the engine relies on: a sign-in
//! form, a dashboard of case rows, multi-step case forms, pre-populated
//! income fields, confirmation dialogues, a green play control and a
//! results table that fills progressively after recomputation.
//!
//! Time is read from `tokio::time`, so tests under a paused clock see
//! rows appear deterministically.

use mab_core::{CaseKind, Employment, ResultsTable};
use mab_portal::{
    ControlDescriptor, ControlKind, ElementRef, InputDescriptor, Key, PortalError, PortalPage,
    TableSnapshot,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const BASE_URL: &str = "https://portal.test";
pub const USERNAME: &str = "broker@example.co.uk";
pub const PASSWORD: &str = "correct-horse";

const SIGN_IN_PATH: &str = "/sign-in";
const DASHBOARD_PATH: &str = "/cases";

/// A case template on the dashboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeCase {
    pub reference: String,
    pub kind: CaseKind,
    /// Form pages before the income section
    pub steps_before_income: usize,
}

impl FakeCase {
    #[must_use]
    pub fn new(reference: impl Into<String>, kind: CaseKind) -> Self {
        Self {
            reference: reference.into(),
            kind,
            steps_before_income: 2,
        }
    }

    #[must_use]
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps_before_income = steps;
        self
    }
}

/// One rendered results row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeRow {
    pub label: String,
    pub cell: String,
}

impl FakeRow {
    #[must_use]
    pub fn new(label: impl Into<String>, cell: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            cell: cell.into(),
        }
    }
}

/// How results appear after recomputation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeResults {
    pub rows: Vec<FakeRow>,
    /// Render a `<table>`; otherwise rows only appear as page text
    pub as_table: bool,
    pub first_row_after: Duration,
    pub row_interval: Duration,
}

impl Default for FakeResults {
    fn default() -> Self {
        Self {
            rows: crate::fixtures::panel_rows(30_000),
            as_table: true,
            first_row_after: Duration::from_secs(20),
            row_interval: Duration::from_secs(5),
        }
    }
}

/// Behaviour switches for a `FakePortal`
#[derive(Debug, Clone)]
pub struct FakePortalConfig {
    pub username: String,
    pub password: String,
    pub cases: Vec<FakeCase>,
    /// Value every income and credit field holds when a case opens
    pub prefill: String,
    /// Select-all/delete and native clear leave the prefill in place
    pub stubborn_fields: bool,
    /// Re-render the value as `£12,345.00` on blur
    pub format_on_blur: bool,
    /// Inputs that append a stray digit on blur
    pub corrupting_fields: Vec<String>,
    /// Each income input stays hidden until the one before it is committed
    pub progressive_fields: bool,
    /// Dialogues raised each time a case opens
    pub dialogs_on_open: usize,
    pub recompute_control: bool,
    /// Omit the unsecured-loans section from credit cases
    pub hide_credit_fields: bool,
    pub fail_screenshots: bool,
    pub results: FakeResults,
}

impl Default for FakePortalConfig {
    fn default() -> Self {
        Self {
            username: USERNAME.to_string(),
            password: PASSWORD.to_string(),
            cases: CaseKind::ALL
                .iter()
                .map(|kind| FakeCase::new(crate::fixtures::case_ref(*kind), *kind))
                .collect(),
            prefill: "45000".to_string(),
            stubborn_fields: false,
            format_on_blur: false,
            corrupting_fields: Vec::new(),
            progressive_fields: false,
            dialogs_on_open: 0,
            recompute_control: true,
            hide_credit_fields: false,
            fail_screenshots: false,
            results: FakeResults::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Blank,
    SignIn,
    Dashboard,
    Form { case: usize, step: usize },
}

#[derive(Debug)]
struct State {
    config: FakePortalConfig,
    screen: Screen,
    url: String,
    logged_in: bool,
    values: HashMap<String, String>,
    selected: Option<String>,
    pending_dialogs: usize,
    recomputed_at: Option<Instant>,
    recompute_clicks: usize,
    sign_in_attempts: usize,
    opened_cases: Vec<String>,
    committed: Vec<(String, String)>,
    screenshots: Vec<PathBuf>,
    closes: usize,
    injected: HashMap<&'static str, VecDeque<PortalError>>,
}

/// A scripted Portal tab
///
/// Cloning shares the underlying state, so a test can keep a handle for
/// inspection after giving one to the engine.
#[derive(Debug, Clone)]
pub struct FakePortal {
    state: Arc<Mutex<State>>,
}

impl Default for FakePortal {
    fn default() -> Self {
        Self::new(FakePortalConfig::default())
    }
}

impl FakePortal {
    #[must_use]
    pub fn new(config: FakePortalConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                config,
                screen: Screen::Blank,
                url: "about:blank".to_string(),
                logged_in: false,
                values: HashMap::new(),
                selected: None,
                pending_dialogs: 0,
                recomputed_at: None,
                recompute_clicks: 0,
                sign_in_attempts: 0,
                opened_cases: Vec::new(),
                committed: Vec::new(),
                screenshots: Vec::new(),
                closes: 0,
                injected: HashMap::new(),
            })),
        }
    }

    /// Make the next call of `method` fail with `error`
    pub fn inject_failure(&self, method: &'static str, error: PortalError) {
        self.state
            .lock()
            .injected
            .entry(method)
            .or_default()
            .push_back(error);
    }

    /// Drop the signed-in session
    pub fn expire_session(&self) {
        self.state.lock().logged_in = false;
    }

    /// Accept only `password` from now on
    pub fn change_password(&self, password: impl Into<String>) {
        self.state.lock().config.password = password.into();
    }

    /// Replace the results shown after the next recomputation
    pub fn set_results(&self, results: FakeResults) {
        self.state.lock().config.results = results;
    }

    pub fn set_recompute_control(&self, present: bool) {
        self.state.lock().config.recompute_control = present;
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.state.lock().logged_in
    }

    #[must_use]
    pub fn value(&self, element: &str) -> Option<String> {
        self.state.lock().values.get(element).cloned()
    }

    /// `(element, value)` for every blur, in order
    #[must_use]
    pub fn committed(&self) -> Vec<(String, String)> {
        self.state.lock().committed.clone()
    }

    /// Last committed value of each element
    #[must_use]
    pub fn final_values(&self) -> HashMap<String, String> {
        self.state.lock().committed.iter().cloned().collect()
    }

    #[must_use]
    pub fn recompute_clicks(&self) -> usize {
        self.state.lock().recompute_clicks
    }

    #[must_use]
    pub fn sign_in_attempts(&self) -> usize {
        self.state.lock().sign_in_attempts
    }

    #[must_use]
    pub fn opened_cases(&self) -> Vec<String> {
        self.state.lock().opened_cases.clone()
    }

    #[must_use]
    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.state.lock().screenshots.clone()
    }

    /// Times the tab was closed
    #[must_use]
    pub fn closes(&self) -> usize {
        self.state.lock().closes
    }

    /// Reference of the case currently open, if any
    #[must_use]
    pub fn current_case(&self) -> Option<String> {
        let state = self.state.lock();
        match state.screen {
            Screen::Form { case, .. } => Some(state.config.cases[case].reference.clone()),
            _ => None,
        }
    }

    /// Forget values, commits and counters (the session survives)
    pub fn reset_counters(&self) {
        let mut state = self.state.lock();
        state.committed.clear();
        state.recompute_clicks = 0;
        state.opened_cases.clear();
        state.screenshots.clear();
    }
}

impl State {
    fn take_injected(&mut self, method: &'static str) -> Result<(), PortalError> {
        match self.injected.get_mut(method).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn navigate(&mut self, screen: Screen) {
        self.url = match screen {
            Screen::Blank => "about:blank".to_string(),
            Screen::SignIn => format!("{BASE_URL}{SIGN_IN_PATH}"),
            Screen::Dashboard => format!("{BASE_URL}{DASHBOARD_PATH}"),
            Screen::Form { case, step } => format!(
                "{BASE_URL}{DASHBOARD_PATH}/{}/step-{}",
                self.config.cases[case].reference,
                step + 1
            ),
        };
        self.screen = screen;
        self.selected = None;
        self.recomputed_at = None;
    }

    fn on_income_section(&self) -> Option<&FakeCase> {
        match self.screen {
            Screen::Form { case, step } => {
                let case = &self.config.cases[case];
                (step >= case.steps_before_income).then_some(case)
            }
            _ => None,
        }
    }

    fn inputs(&self) -> Vec<InputDescriptor> {
        let inputs = match self.screen {
            Screen::SignIn => vec![
                input("email", "Email address", "", "email"),
                input("password", "Password", "", "password"),
            ],
            Screen::Form { .. } => match self.on_income_section() {
                Some(case) => self.income_inputs(case),
                None => vec![input("property-value", "Property value", "Property", "text")],
            },
            Screen::Blank | Screen::Dashboard => Vec::new(),
        };
        inputs
            .into_iter()
            .map(|mut i| {
                i.value = self.values.get(i.element.as_str()).cloned().unwrap_or_default();
                i
            })
            .collect()
    }

    fn income_inputs(&self, case: &FakeCase) -> Vec<InputDescriptor> {
        let mut inputs = Vec::new();
        for index in 0..case.kind.applicant_count() {
            let n = index + 1;
            let section = format!("Applicant {n}");
            match case.kind.employment(index) {
                Employment::Employed => inputs.push(input(
                    &format!("app{n}-salary"),
                    "Annual basic salary",
                    &section,
                    "text",
                )),
                Employment::SelfEmployed => {
                    inputs.push(input(
                        &format!("app{n}-profit-last"),
                        "Net profit - last year",
                        &section,
                        "text",
                    ));
                    inputs.push(input(
                        &format!("app{n}-profit-two"),
                        "Net profit - two years ago",
                        &section,
                        "text",
                    ));
                }
            }
        }
        if self.config.progressive_fields {
            for i in 1..inputs.len() {
                let before = inputs[i - 1].element.as_str();
                let unlocked = self.committed.iter().any(|(id, _)| id == before);
                inputs[i].visible = unlocked;
            }
        }
        inputs.push(input("mortgage-repayments", "Current repayments", "Existing mortgages", "text"));
        if case.kind.has_credit_commitments() && !self.config.hide_credit_fields {
            inputs.push(input("loan-repayments", "Current repayments", "Unsecured loans", "text"));
            inputs.push(input("loan-balance", "Balance on completion", "Unsecured loans", "text"));
        }
        inputs
    }

    fn controls(&self) -> Vec<ControlDescriptor> {
        let mut controls = match self.screen {
            Screen::Blank => Vec::new(),
            Screen::SignIn => {
                let mut submit = button("sign-in", "Sign in");
                submit.is_submit = true;
                vec![submit]
            }
            Screen::Dashboard => self
                .config
                .cases
                .iter()
                .enumerate()
                .map(|(i, case)| {
                    let mut row = button(
                        &format!("row-{i}"),
                        &format!("{}  {}  Draft", case.reference, case.kind),
                    );
                    row.kind = ControlKind::Row;
                    row
                })
                .collect(),
            Screen::Form { .. } => {
                let mut controls = vec![button("back", "Back")];
                if self.on_income_section().is_some() {
                    controls.push(button("save", "Save"));
                    if self.config.recompute_control {
                        let mut play = button("recompute", "");
                        play.green = true;
                        play.has_play_icon = true;
                        controls.push(play);
                    }
                } else {
                    controls.push(button("next", "Save and continue"));
                }
                controls
            }
        };
        if self.pending_dialogs > 0 {
            let mut ok = button("dialog-ok", "OK");
            ok.in_dialog = true;
            controls.push(ok);
        }
        controls
    }

    fn visible_rows(&self) -> &[FakeRow] {
        let results = &self.config.results;
        let shown = if !self.config.recompute_control {
            // cached results from an earlier calculation
            results.rows.len()
        } else if let Some(at) = self.recomputed_at {
            let elapsed = at.elapsed();
            if elapsed < results.first_row_after {
                0
            } else {
                let interval = results.row_interval.as_millis().max(1);
                let extra = (elapsed - results.first_row_after).as_millis() / interval;
                usize::try_from(extra).unwrap_or(usize::MAX).saturating_add(1)
            }
        } else {
            0
        };
        &results.rows[..shown.min(results.rows.len())]
    }

    fn page_text(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        match self.screen {
            Screen::Blank => {}
            Screen::SignIn => lines.extend(["Sign in", "Email address", "Password"].map(String::from)),
            Screen::Dashboard => {
                lines.push("Cases".to_string());
                lines.extend(self.controls().into_iter().map(|c| c.text));
            }
            Screen::Form { step, .. } => match self.on_income_section() {
                None => {
                    lines.push(format!("Property details - step {}", step + 1));
                    lines.push("Property value".to_string());
                }
                Some(_) => {
                    let mut section = String::new();
                    for i in self.inputs() {
                        if i.section != section {
                            lines.push(i.section.clone());
                            section = i.section.clone();
                        }
                        lines.push(i.label);
                    }
                    lines.push("Affordability results".to_string());
                    let rows = self.visible_rows();
                    if !rows.is_empty() {
                        lines.push("Lender  Product  Affordable".to_string());
                        lines.extend(
                            rows.iter()
                                .map(|r| format!("{}  2 year fixed  {}", r.label, r.cell)),
                        );
                    }
                }
            },
        }
        if self.pending_dialogs > 0 {
            lines.push("Please confirm the changes to this case".to_string());
        }
        lines.join("\n")
    }

    fn tables(&self) -> Vec<TableSnapshot> {
        let Some(case) = self.on_income_section() else {
            return Vec::new();
        };
        let mut tables = vec![TableSnapshot {
            element: ElementRef::new("applicants"),
            table: ResultsTable::new(
                vec!["Applicant".into(), "Employment".into()],
                (1..=case.kind.applicant_count())
                    .map(|n| vec![format!("Applicant {n}"), format!("{:?}", case.kind.employment(n - 1))])
                    .collect(),
            ),
        }];
        let rows = self.visible_rows();
        if self.config.results.as_table && !rows.is_empty() {
            tables.push(TableSnapshot {
                element: ElementRef::new("results"),
                table: ResultsTable::new(
                    vec!["Lender".into(), "Product".into(), "Max affordable".into()],
                    rows.iter()
                        .map(|r| vec![r.label.clone(), "2 year fixed".into(), r.cell.clone()])
                        .collect(),
                ),
            });
        }
        tables
    }

    fn require_input(&self, element: &ElementRef) -> Result<(), PortalError> {
        if self.inputs().iter().any(|i| &i.element == element && i.visible) {
            Ok(())
        } else {
            Err(PortalError::ElementDetached(element.to_string()))
        }
    }

    fn open_case(&mut self, case: usize) {
        let reference = self.config.cases[case].reference.clone();
        self.navigate(Screen::Form { case, step: 0 });
        self.pending_dialogs = self.config.dialogs_on_open;
        self.opened_cases.push(reference);
        let prefill = self.config.prefill.clone();
        let ids: Vec<String> = {
            let case = &self.config.cases[case];
            let mut probe = Vec::new();
            for index in 0..case.kind.applicant_count() {
                let n = index + 1;
                probe.extend([
                    format!("app{n}-salary"),
                    format!("app{n}-profit-last"),
                    format!("app{n}-profit-two"),
                ]);
            }
            probe.extend(["loan-repayments", "loan-balance", "mortgage-repayments"].map(String::from));
            probe
        };
        for id in ids {
            self.values.insert(id, prefill.clone());
        }
    }

    fn submit_sign_in(&mut self) {
        self.sign_in_attempts += 1;
        let email = self.values.get("email").cloned().unwrap_or_default();
        let password = self.values.get("password").cloned().unwrap_or_default();
        if email == self.config.username && password == self.config.password {
            self.logged_in = true;
            self.navigate(Screen::Dashboard);
        }
    }

    fn blur(&mut self, id: &str) {
        let Some(value) = self.values.get_mut(id) else {
            return;
        };
        if self.config.corrupting_fields.iter().any(|f| f == id) {
            value.push('9');
        }
        if self.config.format_on_blur {
            if let Ok(n) = value.parse::<u64>() {
                *value = format!("£{}.00", crate::fixtures::group_thousands(n));
            }
        }
        let committed = (id.to_string(), value.clone());
        self.committed.push(committed);
    }

    fn clear(&mut self, id: &str) {
        if !self.config.stubborn_fields {
            self.values.insert(id.to_string(), String::new());
        }
    }
}

fn input(id: &str, label: &str, section: &str, kind: &str) -> InputDescriptor {
    InputDescriptor {
        element: ElementRef::new(id),
        label: label.to_string(),
        section: section.to_string(),
        kind: kind.to_string(),
        name: id.to_string(),
        value: String::new(),
        visible: true,
    }
}

fn button(id: &str, text: &str) -> ControlDescriptor {
    ControlDescriptor {
        element: ElementRef::new(id),
        kind: ControlKind::Button,
        text: text.to_string(),
        is_submit: false,
        green: false,
        has_play_icon: false,
        in_dialog: false,
        visible: true,
    }
}

fn url_path(url: &str) -> &str {
    url.strip_prefix(BASE_URL)
        .unwrap_or(url)
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl PortalPage for FakePortal {
    async fn goto(&self, url: &str) -> Result<(), PortalError> {
        let mut state = self.state.lock();
        state.take_injected("goto")?;
        state.pending_dialogs = 0;
        let path = url_path(url).trim_end_matches('/');
        let screen = match path {
            SIGN_IN_PATH => Screen::SignIn,
            DASHBOARD_PATH if state.logged_in => Screen::Dashboard,
            DASHBOARD_PATH => Screen::SignIn,
            _ => Screen::Blank,
        };
        state.navigate(screen);
        Ok(())
    }

    async fn current_url(&self) -> Result<String, PortalError> {
        let mut state = self.state.lock();
        state.take_injected("current_url")?;
        Ok(state.url.clone())
    }

    async fn page_text(&self) -> Result<String, PortalError> {
        let mut state = self.state.lock();
        state.take_injected("page_text")?;
        Ok(state.page_text())
    }

    async fn inputs(&self) -> Result<Vec<InputDescriptor>, PortalError> {
        let mut state = self.state.lock();
        state.take_injected("inputs")?;
        Ok(state.inputs())
    }

    async fn controls(&self) -> Result<Vec<ControlDescriptor>, PortalError> {
        let mut state = self.state.lock();
        state.take_injected("controls")?;
        Ok(state.controls())
    }

    async fn tables(&self) -> Result<Vec<TableSnapshot>, PortalError> {
        let mut state = self.state.lock();
        state.take_injected("tables")?;
        Ok(state.tables())
    }

    async fn click(&self, element: &ElementRef) -> Result<(), PortalError> {
        let mut state = self.state.lock();
        state.take_injected("click")?;
        if !state.controls().iter().any(|c| &c.element == element) {
            return Err(PortalError::ElementDetached(element.to_string()));
        }
        match (element.as_str(), state.screen) {
            ("dialog-ok", _) => state.pending_dialogs -= 1,
            ("sign-in", _) => state.submit_sign_in(),
            ("next", Screen::Form { case, step }) => {
                state.navigate(Screen::Form { case, step: step + 1 });
            }
            ("back", Screen::Form { case, step }) => {
                state.navigate(Screen::Form {
                    case,
                    step: step.saturating_sub(1),
                });
            }
            ("recompute", _) => {
                state.recompute_clicks += 1;
                state.recomputed_at = Some(Instant::now());
            }
            (id, Screen::Dashboard) => {
                if let Some(case) = id.strip_prefix("row-").and_then(|i| i.parse().ok()) {
                    state.open_case(case);
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn focus(&self, element: &ElementRef) -> Result<(), PortalError> {
        let mut state = self.state.lock();
        state.take_injected("focus")?;
        state.require_input(element)
    }

    async fn select_all(&self, element: &ElementRef) -> Result<(), PortalError> {
        let mut state = self.state.lock();
        state.take_injected("select_all")?;
        state.require_input(element)?;
        state.selected = Some(element.to_string());
        Ok(())
    }

    async fn press_key(&self, element: &ElementRef, key: Key) -> Result<(), PortalError> {
        let mut state = self.state.lock();
        state.take_injected("press_key")?;
        state.require_input(element)?;
        let id = element.as_str();
        let selected = state.selected.take().is_some_and(|s| s == id);
        match key {
            Key::Delete | Key::Backspace if selected => state.clear(id),
            Key::Backspace => {
                state.values.entry(id.to_string()).or_default().pop();
            }
            Key::Tab => state.blur(id),
            Key::Enter if id == "password" => state.submit_sign_in(),
            Key::Delete | Key::Enter | Key::Escape => {}
        }
        Ok(())
    }

    async fn type_char(&self, element: &ElementRef, ch: char) -> Result<(), PortalError> {
        let mut state = self.state.lock();
        state.take_injected("type_char")?;
        state.require_input(element)?;
        let id = element.as_str();
        if state.selected.take().is_some_and(|s| s == id) {
            state.clear(id);
        }
        state.values.entry(id.to_string()).or_default().push(ch);
        Ok(())
    }

    async fn native_clear(&self, element: &ElementRef) -> Result<(), PortalError> {
        let mut state = self.state.lock();
        state.take_injected("native_clear")?;
        state.require_input(element)?;
        state.clear(element.as_str());
        Ok(())
    }

    async fn read_value(&self, element: &ElementRef) -> Result<String, PortalError> {
        let mut state = self.state.lock();
        state.take_injected("read_value")?;
        state.require_input(element)?;
        Ok(state
            .values
            .get(element.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<(), PortalError> {
        let mut state = self.state.lock();
        state.take_injected("scroll_into_view")?;
        if state.inputs().iter().any(|i| &i.element == element)
            || state.controls().iter().any(|c| &c.element == element)
        {
            Ok(())
        } else {
            Err(PortalError::ElementDetached(element.to_string()))
        }
    }

    async fn scroll_to_bottom(&self) -> Result<(), PortalError> {
        self.state.lock().take_injected("scroll_to_bottom")
    }

    async fn wait_for_idle(&self) -> Result<(), PortalError> {
        self.state.lock().take_injected("wait_for_idle")
    }

    async fn screenshot(&self, path: &Path) -> Result<(), PortalError> {
        let mut state = self.state.lock();
        state.take_injected("screenshot")?;
        if state.config.fail_screenshots {
            return Err(PortalError::Driver("screenshot unavailable".into()));
        }
        state.screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn close(&self) -> Result<(), PortalError> {
        let mut state = self.state.lock();
        state.take_injected("close")?;
        state.closes += 1;
        state.logged_in = false;
        state.navigate(Screen::Blank);
        Ok(())
    }
}
