//! Scenario catalogue
//!
//! An ordered, read-only list of scenario descriptors loaded from TOML:
//!
//! ```toml
//! [[scenario]]
//! id = "E-Single-030k"
//! case_kind = "E.Single"
//! total_income = 30000
//! case_ref = "MAB-TPL-E-SINGLE"
//! ```
//!
//! The default 64-scenario matrix is embedded at compile time.

use crate::error::CatalogueError;
use crate::types::{RunType, Scenario, ScenarioId};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

const DEFAULT_CATALOGUE: &str = include_str!("../catalogue/default.toml");

#[derive(Debug, Deserialize)]
struct CatalogueFile {
    #[serde(default, rename = "scenario")]
    scenarios: Vec<Scenario>,
}

/// Validated, ordered scenario list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalogue {
    scenarios: Vec<Scenario>,
}

impl Catalogue {
    /// The embedded default matrix
    ///
    /// # Errors
    /// Only if the embedded file is invalid.
    pub fn embedded() -> Result<Self, CatalogueError> {
        Self::from_toml_str(DEFAULT_CATALOGUE)
    }

    /// Load a catalogue file
    ///
    /// # Errors
    /// I/O, parse or validation failures.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogueError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CatalogueError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalogue = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), scenarios = catalogue.len(), "Loaded catalogue");
        Ok(catalogue)
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// Parse or validation failures.
    pub fn from_toml_str(text: &str) -> Result<Self, CatalogueError> {
        let file: CatalogueFile = toml::from_str(text)?;
        Self::new(file.scenarios)
    }

    /// Validate an in-memory scenario list
    ///
    /// # Errors
    /// Empty list, duplicate ids, zero incomes or empty case references.
    pub fn new(scenarios: Vec<Scenario>) -> Result<Self, CatalogueError> {
        if scenarios.is_empty() {
            return Err(CatalogueError::Empty);
        }
        let mut seen = HashSet::new();
        for scenario in &scenarios {
            let id = scenario.id.as_str();
            if !seen.insert(id) {
                return Err(CatalogueError::DuplicateId(id.to_string()));
            }
            if scenario.total_income == 0 {
                return Err(CatalogueError::ZeroIncome(id.to_string()));
            }
            if scenario.case_ref.as_str().trim().is_empty() {
                return Err(CatalogueError::EmptyCaseRef(id.to_string()));
            }
        }
        Ok(Self { scenarios })
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> + '_ {
        self.scenarios.iter()
    }

    #[must_use]
    pub fn get(&self, id: &ScenarioId) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| &s.id == id)
    }

    /// Scenarios selected by `filter`, in catalogue order
    ///
    /// # Errors
    /// `CatalogueError::UnknownScenario` if the filter names a missing id.
    pub fn select(&self, filter: &ScenarioFilter) -> Result<Vec<Scenario>, CatalogueError> {
        if let Some(missing) = filter.ids.iter().find(|id| self.get(id).is_none()) {
            return Err(CatalogueError::UnknownScenario(missing.to_string()));
        }
        let selected = self
            .scenarios
            .iter()
            .filter(|s| filter.matches(s))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(selected)
    }
}

/// Which scenarios a batch runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioFilter {
    pub run_type: RunType,
    /// Restrict to these ids (empty = no restriction)
    pub ids: Vec<ScenarioId>,
    pub limit: Option<usize>,
}

impl ScenarioFilter {
    #[inline]
    #[must_use]
    pub fn new(run_type: RunType) -> Self {
        Self {
            run_type,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_ids(mut self, ids: impl IntoIterator<Item = ScenarioId>) -> Self {
        self.ids = ids.into_iter().collect();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Whether a scenario passes the run type and id restriction
    #[must_use]
    pub fn matches(&self, scenario: &Scenario) -> bool {
        self.run_type.includes(scenario.case_kind)
            && (self.ids.is_empty() || self.ids.contains(&scenario.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CaseKind;

    #[test]
    fn embedded_matrix_is_complete() {
        let catalogue = Catalogue::embedded().unwrap();
        assert_eq!(catalogue.len(), 64);
        for kind in CaseKind::ALL {
            assert_eq!(catalogue.iter().filter(|s| s.case_kind == kind).count(), 8);
        }
    }

    #[test]
    fn run_types_partition_the_matrix() {
        let catalogue = Catalogue::embedded().unwrap();
        let normal = catalogue.select(&ScenarioFilter::new(RunType::Normal)).unwrap();
        let credit = catalogue.select(&ScenarioFilter::new(RunType::Credit)).unwrap();
        let full = catalogue.select(&ScenarioFilter::new(RunType::Full)).unwrap();
        assert_eq!(normal.len(), 32);
        assert_eq!(credit.len(), 32);
        assert_eq!(full.len(), 64);
        assert!(credit.iter().all(|s| s.case_kind.has_credit_commitments()));
    }

    #[test]
    fn id_filter_and_limit_keep_order() {
        let catalogue = Catalogue::embedded().unwrap();
        let filter = ScenarioFilter::new(RunType::Full)
            .with_ids(["S-Joint-200k".into(), "E-Single-030k".into()])
            .with_limit(Some(5));
        let selected = catalogue.select(&filter).unwrap();
        let ids: Vec<_> = selected.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["E-Single-030k", "S-Joint-200k"]);

        let limited = catalogue
            .select(&ScenarioFilter::new(RunType::Normal).with_limit(Some(3)))
            .unwrap();
        assert_eq!(limited.len(), 3);
        assert_eq!(limited[0].id.as_str(), "E-Single-030k");
    }

    #[test]
    fn unknown_id_is_rejected() {
        let catalogue = Catalogue::embedded().unwrap();
        let filter = ScenarioFilter::new(RunType::Full).with_ids(["nope".into()]);
        assert!(matches!(
            catalogue.select(&filter),
            Err(CatalogueError::UnknownScenario(id)) if id == "nope"
        ));
    }

    #[test]
    fn validation_errors() {
        let dup = r#"
            [[scenario]]
            id = "a"
            case_kind = "E.Single"
            total_income = 30000
            case_ref = "X"

            [[scenario]]
            id = "a"
            case_kind = "E.Joint"
            total_income = 30000
            case_ref = "Y"
        "#;
        assert!(matches!(
            Catalogue::from_toml_str(dup),
            Err(CatalogueError::DuplicateId(_))
        ));

        let zero = r#"
            [[scenario]]
            id = "a"
            case_kind = "E.Single"
            total_income = 0
            case_ref = "X"
        "#;
        assert!(matches!(
            Catalogue::from_toml_str(zero),
            Err(CatalogueError::ZeroIncome(_))
        ));

        let blank = r#"
            [[scenario]]
            id = "a"
            case_kind = "C.Self-Joint"
            total_income = 10
            case_ref = "  "
        "#;
        assert!(matches!(
            Catalogue::from_toml_str(blank),
            Err(CatalogueError::EmptyCaseRef(_))
        ));

        assert!(matches!(Catalogue::from_toml_str(""), Err(CatalogueError::Empty)));
        assert!(matches!(
            Catalogue::from_toml_str("[[scenario]]\nid = 1"),
            Err(CatalogueError::Parse(_))
        ));
    }
}
