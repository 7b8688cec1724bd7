//! Per-scenario state machine
//!
//! ```text
//! CREATED -> LOGGED_IN -> CASE_OPENED -> AT_INCOME -> INCOME_WRITTEN
//!         -> (CREDIT_WRITTEN)? -> RECOMPUTED -> RESULTS_READY -> EXTRACTED
//! ```
//!
//! Every non-terminal state may move to `FAILED`. Terminal states have no
//! outgoing transitions.

use crate::error::StateError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a scenario execution currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioState {
    Created,
    LoggedIn,
    CaseOpened,
    AtIncome,
    IncomeWritten,
    CreditWritten,
    Recomputed,
    ResultsReady,
    Extracted,
    Failed,
}

impl ScenarioState {
    pub const ALL: [ScenarioState; 10] = [
        ScenarioState::Created,
        ScenarioState::LoggedIn,
        ScenarioState::CaseOpened,
        ScenarioState::AtIncome,
        ScenarioState::IncomeWritten,
        ScenarioState::CreditWritten,
        ScenarioState::Recomputed,
        ScenarioState::ResultsReady,
        ScenarioState::Extracted,
        ScenarioState::Failed,
    ];

    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Extracted | Self::Failed)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::LoggedIn => "LOGGED_IN",
            Self::CaseOpened => "CASE_OPENED",
            Self::AtIncome => "AT_INCOME",
            Self::IncomeWritten => "INCOME_WRITTEN",
            Self::CreditWritten => "CREDIT_WRITTEN",
            Self::Recomputed => "RECOMPUTED",
            Self::ResultsReady => "RESULTS_READY",
            Self::Extracted => "EXTRACTED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validates a state transition
///
/// # Errors
/// `StateError::IllegalTransition` when `to` is not reachable from `from`.
pub fn validate_transition(from: ScenarioState, to: ScenarioState) -> Result<(), StateError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StateError::IllegalTransition { from, to })
    }
}

/// States reachable in one step from `from`
#[must_use]
pub fn allowed_transitions(from: ScenarioState) -> Vec<ScenarioState> {
    use ScenarioState::{
        AtIncome, CaseOpened, Created, CreditWritten, Extracted, Failed, IncomeWritten, LoggedIn,
        Recomputed, ResultsReady,
    };
    match from {
        Created => vec![LoggedIn, Failed],
        LoggedIn => vec![CaseOpened, Failed],
        CaseOpened => vec![AtIncome, Failed],
        AtIncome => vec![IncomeWritten, Failed],
        IncomeWritten => vec![CreditWritten, Recomputed, Failed],
        CreditWritten => vec![Recomputed, Failed],
        Recomputed => vec![ResultsReady, Failed],
        ResultsReady => vec![Extracted, Failed],
        Extracted | Failed => vec![],
    }
}

/// Current state plus the path that led to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioProgress {
    state: ScenarioState,
    history: Vec<ScenarioState>,
}

impl Default for ScenarioProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioProgress {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ScenarioState::Created,
            history: vec![ScenarioState::Created],
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> ScenarioState {
        self.state
    }

    /// Every state visited, in order
    #[inline]
    #[must_use]
    pub fn history(&self) -> &[ScenarioState] {
        &self.history
    }

    /// Last state before `FAILED`, or the current state
    #[must_use]
    pub fn last_good_state(&self) -> ScenarioState {
        self.history
            .iter()
            .rev()
            .copied()
            .find(|s| *s != ScenarioState::Failed)
            .unwrap_or(ScenarioState::Created)
    }

    /// Move to `to` if the table allows it
    ///
    /// # Errors
    /// `StateError::IllegalTransition`; the progress is left unchanged.
    pub fn advance(&mut self, to: ScenarioState) -> Result<(), StateError> {
        validate_transition(self.state, to)?;
        self.state = to;
        self.history.push(to);
        Ok(())
    }

    /// Move to `FAILED`; a no-op once terminal
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = ScenarioState::Failed;
            self.history.push(ScenarioState::Failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_without_credit() {
        let mut progress = ScenarioProgress::new();
        for next in [
            ScenarioState::LoggedIn,
            ScenarioState::CaseOpened,
            ScenarioState::AtIncome,
            ScenarioState::IncomeWritten,
            ScenarioState::Recomputed,
            ScenarioState::ResultsReady,
            ScenarioState::Extracted,
        ] {
            progress.advance(next).unwrap();
        }
        assert_eq!(progress.state(), ScenarioState::Extracted);
        assert_eq!(progress.history().len(), 8);
    }

    #[test]
    fn credit_step_is_optional_but_ordered() {
        assert!(validate_transition(ScenarioState::IncomeWritten, ScenarioState::CreditWritten).is_ok());
        assert!(validate_transition(ScenarioState::CreditWritten, ScenarioState::Recomputed).is_ok());
        assert!(validate_transition(ScenarioState::AtIncome, ScenarioState::CreditWritten).is_err());
    }

    #[test]
    fn cannot_skip_steps() {
        let mut progress = ScenarioProgress::new();
        let err = progress.advance(ScenarioState::AtIncome).unwrap_err();
        assert_eq!(
            err,
            StateError::IllegalTransition {
                from: ScenarioState::Created,
                to: ScenarioState::AtIncome
            }
        );
        assert_eq!(progress.state(), ScenarioState::Created);
    }

    #[test]
    fn failure_remembers_last_good_state() {
        let mut progress = ScenarioProgress::new();
        progress.advance(ScenarioState::LoggedIn).unwrap();
        progress.fail();
        progress.fail();
        assert_eq!(progress.state(), ScenarioState::Failed);
        assert_eq!(progress.last_good_state(), ScenarioState::LoggedIn);
        assert_eq!(progress.history().len(), 3);
    }

    #[test]
    fn terminal_states_have_no_exits() {
        assert!(allowed_transitions(ScenarioState::Extracted).is_empty());
        assert!(allowed_transitions(ScenarioState::Failed).is_empty());
    }

    #[test]
    fn serialises_screaming() {
        let json = serde_json::to_string(&ScenarioState::ResultsReady).unwrap();
        assert_eq!(json, "\"RESULTS_READY\"");
    }
}
