//! Error types for MAB Core
//!
//! Provides:
//! - The closed failure taxonomy recorded against scenarios
//! - Catalogue loading errors
//! - Income planning errors
//! - State machine errors

use crate::state::ScenarioState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Failure classification carried by records and errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Browser driver could not launch
    BrowserStartupError,
    /// Sign-in did not leave the sign-in path
    LoginError,
    /// No dashboard row carries the case reference
    CaseNotFound,
    /// Income section never appeared within the navigation bound
    NavigationStalled,
    /// A field read back something other than what was typed
    FieldWriteMismatch,
    /// Unsecured-loan fields could not be located unambiguously
    CreditFieldNotFound,
    /// No recomputation control; results may be cached
    NoRecomputationControl,
    /// Results never reached the stability verdict
    ResultsIncomplete,
    /// No affordability table; text fallback used
    NoTableFound,
    /// Unclassified driver failure (timeouts, detached elements)
    DriverFailure,
}

impl FailureKind {
    /// Whether this failure ends the whole batch
    #[inline]
    #[must_use]
    pub fn is_batch_fatal(self) -> bool {
        matches!(self, Self::BrowserStartupError | Self::LoginError)
    }

    /// Whether this failure only annotates an otherwise usable result
    #[inline]
    #[must_use]
    pub fn is_warning(self) -> bool {
        matches!(
            self,
            Self::NoRecomputationControl | Self::ResultsIncomplete | Self::NoTableFound
        )
    }

    /// Stable name used in logs and stores
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BrowserStartupError => "BrowserStartupError",
            Self::LoginError => "LoginError",
            Self::CaseNotFound => "CaseNotFound",
            Self::NavigationStalled => "NavigationStalled",
            Self::FieldWriteMismatch => "FieldWriteMismatch",
            Self::CreditFieldNotFound => "CreditFieldNotFound",
            Self::NoRecomputationControl => "NoRecomputationControl",
            Self::ResultsIncomplete => "ResultsIncomplete",
            Self::NoTableFound => "NoTableFound",
            Self::DriverFailure => "DriverFailure",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalogue loading errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    /// File could not be read
    #[error("cannot read catalogue {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML did not parse
    #[error("invalid catalogue: {0}")]
    Parse(#[from] toml::de::Error),

    /// Same id used twice
    #[error("duplicate scenario id: {0}")]
    DuplicateId(String),

    /// Income must be a positive integer
    #[error("scenario {0} has a zero total income")]
    ZeroIncome(String),

    /// Case reference must be present
    #[error("scenario {0} has an empty case reference")]
    EmptyCaseRef(String),

    /// Nothing to run
    #[error("catalogue contains no scenarios")]
    Empty,

    /// Filter names an id the catalogue does not contain
    #[error("unknown scenario id: {0}")]
    UnknownScenario(String),
}

/// Income planning errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// Income must be positive
    #[error("total income must be positive")]
    ZeroIncome,

    /// A joint plan would write the undivided total into a field
    #[error("joint plan for {kind} writes undivided total {total} into a field")]
    UndividedIncome { kind: String, total: u64 },
}

/// State machine errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// Transition not in the allowed table
    #[error("illegal scenario transition {from:?} -> {to:?}")]
    IllegalTransition {
        from: ScenarioState,
        to: ScenarioState,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kind_classification() {
        assert!(FailureKind::LoginError.is_batch_fatal());
        assert!(FailureKind::BrowserStartupError.is_batch_fatal());
        assert!(!FailureKind::CaseNotFound.is_batch_fatal());
        assert!(FailureKind::NoTableFound.is_warning());
        assert!(!FailureKind::FieldWriteMismatch.is_warning());
    }

    #[test]
    fn failure_kind_serialises_by_name() {
        let json = serde_json::to_string(&FailureKind::CreditFieldNotFound).unwrap();
        assert_eq!(json, "\"CreditFieldNotFound\"");
        assert_eq!(FailureKind::CreditFieldNotFound.to_string(), "CreditFieldNotFound");
    }

    #[test]
    fn catalogue_error_display() {
        let err = CatalogueError::DuplicateId("E-Single-030k".to_string());
        assert!(err.to_string().contains("duplicate scenario id"));
    }
}
