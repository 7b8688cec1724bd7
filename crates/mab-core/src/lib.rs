//! MAB Core - scenario model and pure benchmarking logic
//!
//! Everything here is deterministic and browser-free:
//! - Scenario descriptors, case kinds and the catalogue
//! - Income planning (total income -> per-applicant field amounts)
//! - The canonical lender panel and label normalisation
//! - Amount parsing and results extraction from table/text snapshots
//! - Adaptive wait budgets and the population-stability rule
//! - Per-scenario statistics and run summaries
//! - The per-scenario state machine
//!
//! # Example
//!
//! ```rust
//! use mab_core::{plan_income, CaseKind, FieldRole};
//!
//! let plan = plan_income(CaseKind::EJoint, 60_000).unwrap();
//! assert_eq!(plan.applicants.len(), 2);
//! for applicant in &plan.applicants {
//!     assert_eq!(applicant.amount_for(FieldRole::AnnualBasicSalary), Some(30_000));
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod amounts;
pub mod budget;
pub mod catalogue;
pub mod error;
pub mod extraction;
pub mod panel;
pub mod planner;
pub mod record;
pub mod state;
pub mod statistics;
pub mod types;

// Re-exports for convenience
pub use amounts::{count_sigils, is_plausible_amount, parse_amount, MAX_AMOUNT, MIN_AMOUNT};
pub use budget::{PollObservation, StabilityTracker, WaitPolicy, WaitVerdict};
pub use catalogue::{Catalogue, ScenarioFilter};
pub use error::{CatalogueError, FailureKind, PlanError, StateError};
pub use extraction::{
    extract_from_table, extract_from_text, find_results_table, Extraction, ResultsTable,
};
pub use panel::{Lender, LenderAmounts, LenderPanel};
pub use planner::{
    plan_income, ApplicantPlan, CreditCommitments, FieldRole, IncomePlan, PlannedField,
};
pub use record::{
    FailureRecord, RankShare, RunSummary, ScenarioRecord, ScenarioStatus, SuccessPolicy, WaitReport,
};
pub use state::{allowed_transitions, validate_transition, ScenarioProgress, ScenarioState};
pub use statistics::{gen_h_rank, scenario_statistics, RunTally, ScenarioStatistics};
pub use types::{
    CaseKind, CaseRef, Coverage, Employment, ExtractionSource, RunType, Scenario, ScenarioId,
    SessionId,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with MAB Core
    pub use crate::{
        plan_income, CaseKind, Catalogue, Coverage, FailureKind, IncomePlan, Lender,
        LenderAmounts, LenderPanel, RunSummary, RunType, Scenario, ScenarioId, ScenarioRecord,
        ScenarioState, SessionId, WaitPolicy,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
