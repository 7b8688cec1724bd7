//! Core types for MAB
//!
//! Defines the fundamental scenario vocabulary:
//! - Identifiers (scenario, session, portal case reference)
//! - Case kinds and the applicant/employment/credit shape they imply
//! - Run types (catalogue filters)
//! - Result annotations (coverage, extraction source)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Scenario identifier, unique within a catalogue
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(pub String);

impl ScenarioId {
    /// Create new scenario id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScenarioId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Batch session identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Ulid);

impl SessionId {
    /// Generate new session ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// Opaque reference to a pre-provisioned portal case template
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseRef(pub String);

impl CaseRef {
    /// Create new case reference
    #[inline]
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Employment type of one applicant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Employment {
    /// Salaried (annual basic salary)
    Employed,
    /// Self-employed (net profit over two years)
    SelfEmployed,
}

/// Portal case shape
///
/// The kind fixes applicant count, employment mix and whether the
/// template carries credit commitments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CaseKind {
    #[serde(rename = "E.Single")]
    ESingle,
    #[serde(rename = "E.Joint")]
    EJoint,
    #[serde(rename = "S.Single")]
    SSingle,
    #[serde(rename = "S.Joint")]
    SJoint,
    #[serde(rename = "C.E-Single")]
    CESingle,
    #[serde(rename = "C.E-Joint")]
    CEJoint,
    #[serde(rename = "C.Self-Single")]
    CSelfSingle,
    #[serde(rename = "C.Self-Joint")]
    CSelfJoint,
}

impl CaseKind {
    /// All case kinds in catalogue order
    pub const ALL: [CaseKind; 8] = [
        CaseKind::ESingle,
        CaseKind::EJoint,
        CaseKind::SSingle,
        CaseKind::SJoint,
        CaseKind::CESingle,
        CaseKind::CEJoint,
        CaseKind::CSelfSingle,
        CaseKind::CSelfJoint,
    ];

    /// Catalogue label (`E.Single`, `C.Self-Joint`, ...)
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            CaseKind::ESingle => "E.Single",
            CaseKind::EJoint => "E.Joint",
            CaseKind::SSingle => "S.Single",
            CaseKind::SJoint => "S.Joint",
            CaseKind::CESingle => "C.E-Single",
            CaseKind::CEJoint => "C.E-Joint",
            CaseKind::CSelfSingle => "C.Self-Single",
            CaseKind::CSelfJoint => "C.Self-Joint",
        }
    }

    /// Whether the case has two applicants
    #[inline]
    #[must_use]
    pub fn is_joint(self) -> bool {
        matches!(
            self,
            CaseKind::EJoint | CaseKind::SJoint | CaseKind::CEJoint | CaseKind::CSelfJoint
        )
    }

    /// Number of applicants (1 or 2)
    #[inline]
    #[must_use]
    pub fn applicant_count(self) -> usize {
        if self.is_joint() {
            2
        } else {
            1
        }
    }

    /// Whether the template carries an unsecured-loans section to rewrite
    #[inline]
    #[must_use]
    pub fn has_credit_commitments(self) -> bool {
        matches!(
            self,
            CaseKind::CESingle | CaseKind::CEJoint | CaseKind::CSelfSingle | CaseKind::CSelfJoint
        )
    }

    /// Whether the first applicant is self-employed
    #[inline]
    #[must_use]
    pub fn is_self_employed(self) -> bool {
        matches!(
            self,
            CaseKind::SSingle | CaseKind::SJoint | CaseKind::CSelfSingle | CaseKind::CSelfJoint
        )
    }

    /// Employment of applicant `index` (0-based)
    ///
    /// Only the first applicant of a self-employed case is self-employed;
    /// a joint partner is always employed.
    #[must_use]
    pub fn employment(self, index: usize) -> Employment {
        if index == 0 && self.is_self_employed() {
            Employment::SelfEmployed
        } else {
            Employment::Employed
        }
    }

    /// The same shape without credit commitments
    #[must_use]
    pub fn income_shape(self) -> CaseKind {
        match self {
            CaseKind::CESingle => CaseKind::ESingle,
            CaseKind::CEJoint => CaseKind::EJoint,
            CaseKind::CSelfSingle => CaseKind::SSingle,
            CaseKind::CSelfJoint => CaseKind::SJoint,
            other => other,
        }
    }
}

impl fmt::Display for CaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CaseKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        CaseKind::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown case kind: {wanted}"))
    }
}

/// Immutable scenario descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Catalogue identifier
    pub id: ScenarioId,
    /// Applicant/employment/credit shape
    pub case_kind: CaseKind,
    /// Total household income in GBP
    pub total_income: u64,
    /// Portal case template to rewrite
    pub case_ref: CaseRef,
}

impl Scenario {
    /// Create new scenario
    #[inline]
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        case_kind: CaseKind,
        total_income: u64,
        case_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: ScenarioId::new(id),
            case_kind,
            total_income,
            case_ref: CaseRef::new(case_ref),
        }
    }
}

/// Catalogue filter selecting which scenarios a batch runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    /// Scenarios without credit commitments
    #[default]
    Normal,
    /// Credit-bearing scenarios only
    Credit,
    /// Every scenario
    Full,
}

impl RunType {
    /// Whether a case kind belongs to this run type
    #[inline]
    #[must_use]
    pub fn includes(self, kind: CaseKind) -> bool {
        match self {
            RunType::Normal => !kind.has_credit_commitments(),
            RunType::Credit => kind.has_credit_commitments(),
            RunType::Full => true,
        }
    }

    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunType::Normal => "normal",
            RunType::Credit => "credit",
            RunType::Full => "full",
        }
    }
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(RunType::Normal),
            "credit" => Ok(RunType::Credit),
            "full" => Ok(RunType::Full),
            other => Err(format!("unknown run mode: {other} (expected normal, credit or full)")),
        }
    }
}

/// Proportion of the panel present in a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coverage {
    #[default]
    Full,
    Partial,
}

/// Where the lender amounts were read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    /// The affordability results table
    Table,
    /// Line-by-line page text; weaker evidence
    TextFallback,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_kind_shape() {
        assert_eq!(CaseKind::ESingle.applicant_count(), 1);
        assert_eq!(CaseKind::CSelfJoint.applicant_count(), 2);
        assert!(CaseKind::CEJoint.has_credit_commitments());
        assert!(!CaseKind::SJoint.has_credit_commitments());
        assert_eq!(CaseKind::SJoint.employment(0), Employment::SelfEmployed);
        assert_eq!(CaseKind::SJoint.employment(1), Employment::Employed);
        assert_eq!(CaseKind::CSelfSingle.income_shape(), CaseKind::SSingle);
    }

    #[test]
    fn case_kind_labels_round_trip() {
        for kind in CaseKind::ALL {
            assert_eq!(kind.label().parse::<CaseKind>().unwrap(), kind);
        }
        assert!("X.Single".parse::<CaseKind>().is_err());
    }

    #[test]
    fn case_kind_serde_uses_labels() {
        let json = serde_json::to_string(&CaseKind::CEJoint).unwrap();
        assert_eq!(json, "\"C.E-Joint\"");
    }

    #[test]
    fn run_type_filters() {
        assert!(RunType::Normal.includes(CaseKind::EJoint));
        assert!(!RunType::Normal.includes(CaseKind::CESingle));
        assert!(RunType::Credit.includes(CaseKind::CSelfJoint));
        assert!(RunType::Full.includes(CaseKind::SSingle));
        assert_eq!("CREDIT".parse::<RunType>().unwrap(), RunType::Credit);
        assert!("weekly".parse::<RunType>().is_err());
    }

    #[test]
    fn session_id_parses_back() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
