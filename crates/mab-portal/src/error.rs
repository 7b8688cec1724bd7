//! Portal error types
//!
//! Every error maps onto the closed `FailureKind` taxonomy so the
//! executor can record it without string matching.

use mab_core::{FailureKind, FieldRole};

/// Errors raised while driving the Portal
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortalError {
    /// Browser driver could not launch
    #[error("browser failed to start: {0}")]
    BrowserStartup(String),

    /// Still on the sign-in path after submitting credentials
    #[error("login failed: {0}")]
    Login(String),

    /// No dashboard row carries the case reference
    #[error("case not found: {0}")]
    CaseNotFound(String),

    /// Income markers never appeared
    #[error("navigation stalled after {steps} step(s): {reason}")]
    NavigationStalled { steps: usize, reason: String },

    /// Read-back differs from the typed literal
    #[error("{field}: intended {intended}, observed {observed:?}")]
    FieldWriteMismatch {
        field: String,
        intended: String,
        observed: String,
    },

    /// No input matches a planned income field
    #[error("no input for applicant {applicant} {role}")]
    IncomeFieldNotFound { applicant: usize, role: FieldRole },

    /// Unsecured-loan fields missing or ambiguous
    #[error("credit field not found: {0}")]
    CreditFieldNotFound(String),

    /// A single Portal call exceeded the action timeout
    #[error("{action} timed out after {timeout_ms}ms")]
    ActionTimeout { action: &'static str, timeout_ms: u64 },

    /// Element reference no longer resolves (page re-rendered)
    #[error("element detached: {0}")]
    ElementDetached(String),

    /// Any other driver failure
    #[error("driver error: {0}")]
    Driver(String),
}

impl PortalError {
    /// Taxonomy entry recorded against the scenario
    #[must_use]
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::BrowserStartup(_) => FailureKind::BrowserStartupError,
            Self::Login(_) => FailureKind::LoginError,
            Self::CaseNotFound(_) => FailureKind::CaseNotFound,
            Self::NavigationStalled { .. } => FailureKind::NavigationStalled,
            Self::FieldWriteMismatch { .. } | Self::IncomeFieldNotFound { .. } => {
                FailureKind::FieldWriteMismatch
            }
            Self::CreditFieldNotFound(_) => FailureKind::CreditFieldNotFound,
            Self::ActionTimeout { .. } | Self::ElementDetached(_) | Self::Driver(_) => {
                FailureKind::DriverFailure
            }
        }
    }

    /// Check if the failed transition may be retried once
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ActionTimeout { .. } | Self::ElementDetached(_))
    }

    /// Check if this error ends the batch
    #[inline]
    #[must_use]
    pub fn is_batch_fatal(&self) -> bool {
        self.failure_kind().is_batch_fatal()
    }
}

impl From<chromiumoxide::error::CdpError> for PortalError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::Driver(err.to_string())
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        Self::Driver(format!("unexpected page payload: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let err = PortalError::ActionTimeout {
            action: "click",
            timeout_ms: 30_000,
        };
        assert!(err.is_retryable());
        assert_eq!(err.failure_kind(), FailureKind::DriverFailure);

        let err = PortalError::Login("still on /sign-in".into());
        assert!(err.is_batch_fatal());
        assert!(!err.is_retryable());

        let err = PortalError::IncomeFieldNotFound {
            applicant: 2,
            role: FieldRole::AnnualBasicSalary,
        };
        assert_eq!(err.failure_kind(), FailureKind::FieldWriteMismatch);
        assert_eq!(err.to_string(), "no input for applicant 2 annual basic salary");
    }

    #[test]
    fn mismatch_message_names_field() {
        let err = PortalError::FieldWriteMismatch {
            field: "applicant 1 annual basic salary".into(),
            intended: "30000".into(),
            observed: "130000".into(),
        };
        assert_eq!(
            err.to_string(),
            "applicant 1 annual basic salary: intended 30000, observed \"130000\""
        );
    }
}
