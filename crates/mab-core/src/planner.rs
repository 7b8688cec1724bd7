//! Income planner
//!
//! Single source of truth for how a scenario's total income is split
//! across applicants and portal fields. Pure: identical inputs always
//! produce identical plans.
//!
//! | Kind | App1 | App2 |
//! |------|------|------|
//! | `E.Single(T)` | salary `T` | - |
//! | `E.Joint(T)` | salary `T/2` | salary `T/2` |
//! | `S.Single(T)` | profit last `T`, profit two `T/2` | - |
//! | `S.Joint(T)` | profit last `T/2`, profit two `T/4` | salary `T/2` |
//!
//! Credit variants reuse the plan of their income shape and add
//! commitments derived from App1's share (`T` single, `T/2` joint).
//! All divisions floor.

use crate::error::PlanError;
use crate::types::{CaseKind, Employment};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Income field a planned amount is written into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    AnnualBasicSalary,
    NetProfitLastYear,
    NetProfitTwoYearsAgo,
}

impl FieldRole {
    /// Human-readable name for audit lines
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            FieldRole::AnnualBasicSalary => "annual basic salary",
            FieldRole::NetProfitLastYear => "net profit (last year)",
            FieldRole::NetProfitTwoYearsAgo => "net profit (two years ago)",
        }
    }
}

impl fmt::Display for FieldRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// One amount destined for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedField {
    pub role: FieldRole,
    pub amount: u64,
}

impl PlannedField {
    #[inline]
    #[must_use]
    pub fn new(role: FieldRole, amount: u64) -> Self {
        Self { role, amount }
    }
}

/// Ordered field amounts for one applicant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantPlan {
    /// 1-based applicant number
    pub applicant: usize,
    pub employment: Employment,
    pub fields: Vec<PlannedField>,
}

impl ApplicantPlan {
    /// Planned amount for a role, if this applicant has that field
    #[must_use]
    pub fn amount_for(&self, role: FieldRole) -> Option<u64> {
        self.fields.iter().find(|f| f.role == role).map(|f| f.amount)
    }
}

/// Unsecured-loan amounts for credit-bearing scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCommitments {
    /// App1's income share the commitments derive from
    pub base: u64,
    /// floor(1% of base)
    pub current_repayments: u64,
    /// floor(10% of base)
    pub balance_on_completion: u64,
}

impl CreditCommitments {
    /// Derive commitments from App1's share
    #[inline]
    #[must_use]
    pub fn from_base(base: u64) -> Self {
        Self {
            base,
            current_repayments: base / 100,
            balance_on_completion: base / 10,
        }
    }
}

/// Complete income plan for one scenario execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomePlan {
    pub case_kind: CaseKind,
    pub total_income: u64,
    pub applicants: Vec<ApplicantPlan>,
    pub credit: Option<CreditCommitments>,
}

impl IncomePlan {
    /// Plan for applicant `n` (1-based)
    #[must_use]
    pub fn applicant(&self, n: usize) -> Option<&ApplicantPlan> {
        self.applicants.iter().find(|a| a.applicant == n)
    }

    /// Every planned field with its applicant number, in write order
    pub fn fields(&self) -> impl Iterator<Item = (usize, &PlannedField)> + '_ {
        self.applicants
            .iter()
            .flat_map(|a| a.fields.iter().map(move |f| (a.applicant, f)))
    }

    /// Audit lines stating every derived amount
    ///
    /// Logged by the executor before anything is written.
    #[must_use]
    pub fn audit_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} total income £{} across {} applicant(s)",
            self.case_kind,
            self.total_income,
            self.applicants.len()
        )];
        for (applicant, field) in self.fields() {
            lines.push(format!(
                "applicant {applicant}: {} = £{}",
                field.role, field.amount
            ));
        }
        if let Some(credit) = &self.credit {
            lines.push(format!(
                "credit commitments (base £{}): current repayments = £{}, balance on completion = £{}",
                credit.base, credit.current_repayments, credit.balance_on_completion
            ));
        }
        lines
    }

    fn check_split(&self) -> Result<(), PlanError> {
        if self.case_kind.is_joint() && self.fields().any(|(_, f)| f.amount == self.total_income) {
            return Err(PlanError::UndividedIncome {
                kind: self.case_kind.to_string(),
                total: self.total_income,
            });
        }
        Ok(())
    }
}

/// Derive the income plan for a scenario shape
///
/// # Errors
/// - `PlanError::ZeroIncome` when `total_income` is zero
/// - `PlanError::UndividedIncome` if a joint plan would carry the total
pub fn plan_income(case_kind: CaseKind, total_income: u64) -> Result<IncomePlan, PlanError> {
    use FieldRole::{AnnualBasicSalary, NetProfitLastYear, NetProfitTwoYearsAgo};

    if total_income == 0 {
        return Err(PlanError::ZeroIncome);
    }

    let t = total_income;
    let applicants = match case_kind.income_shape() {
        CaseKind::ESingle => vec![applicant(case_kind, 1, vec![(AnnualBasicSalary, t)])],
        CaseKind::EJoint => vec![
            applicant(case_kind, 1, vec![(AnnualBasicSalary, t / 2)]),
            applicant(case_kind, 2, vec![(AnnualBasicSalary, t / 2)]),
        ],
        CaseKind::SSingle => vec![applicant(
            case_kind,
            1,
            vec![(NetProfitLastYear, t), (NetProfitTwoYearsAgo, t / 2)],
        )],
        // income_shape() only yields the four base shapes
        _ => vec![
            applicant(
                case_kind,
                1,
                vec![(NetProfitLastYear, t / 2), (NetProfitTwoYearsAgo, t / 4)],
            ),
            applicant(case_kind, 2, vec![(AnnualBasicSalary, t / 2)]),
        ],
    };

    let credit = case_kind.has_credit_commitments().then(|| {
        let base = if case_kind.is_joint() { t / 2 } else { t };
        CreditCommitments::from_base(base)
    });

    let plan = IncomePlan {
        case_kind,
        total_income,
        applicants,
        credit,
    };
    plan.check_split()?;
    Ok(plan)
}

fn applicant(kind: CaseKind, n: usize, fields: Vec<(FieldRole, u64)>) -> ApplicantPlan {
    ApplicantPlan {
        applicant: n,
        employment: kind.employment(n - 1),
        fields: fields
            .into_iter()
            .map(|(role, amount)| PlannedField::new(role, amount))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn e_single_writes_total_salary() {
        let plan = plan_income(CaseKind::ESingle, 30_000).unwrap();
        assert_eq!(plan.applicants.len(), 1);
        assert_eq!(
            plan.applicants[0].fields,
            vec![PlannedField::new(FieldRole::AnnualBasicSalary, 30_000)]
        );
        assert!(plan.credit.is_none());
    }

    #[test]
    fn e_joint_halves_salary() {
        let plan = plan_income(CaseKind::EJoint, 60_000).unwrap();
        for a in &plan.applicants {
            assert_eq!(a.amount_for(FieldRole::AnnualBasicSalary), Some(30_000));
        }
        assert!(plan.fields().all(|(_, f)| f.amount != 60_000));
    }

    #[test]
    fn s_single_profits() {
        let plan = plan_income(CaseKind::SSingle, 40_000).unwrap();
        let app1 = plan.applicant(1).unwrap();
        assert_eq!(app1.employment, Employment::SelfEmployed);
        assert_eq!(app1.amount_for(FieldRole::NetProfitLastYear), Some(40_000));
        assert_eq!(app1.amount_for(FieldRole::NetProfitTwoYearsAgo), Some(20_000));
    }

    #[test]
    fn s_joint_split() {
        let plan = plan_income(CaseKind::SJoint, 200_000).unwrap();
        let app1 = plan.applicant(1).unwrap();
        let app2 = plan.applicant(2).unwrap();
        assert_eq!(app1.amount_for(FieldRole::NetProfitLastYear), Some(100_000));
        assert_eq!(app1.amount_for(FieldRole::NetProfitTwoYearsAgo), Some(50_000));
        assert_eq!(app2.employment, Employment::Employed);
        assert_eq!(app2.amount_for(FieldRole::AnnualBasicSalary), Some(100_000));
    }

    #[test]
    fn credit_single_uses_total_as_base() {
        let plan = plan_income(CaseKind::CESingle, 30_000).unwrap();
        let credit = plan.credit.unwrap();
        assert_eq!(credit.base, 30_000);
        assert_eq!(credit.current_repayments, 300);
        assert_eq!(credit.balance_on_completion, 3_000);
    }

    #[test]
    fn credit_joint_uses_half_as_base() {
        let plan = plan_income(CaseKind::CEJoint, 100_000).unwrap();
        for a in &plan.applicants {
            assert_eq!(a.amount_for(FieldRole::AnnualBasicSalary), Some(50_000));
        }
        let credit = plan.credit.unwrap();
        assert_eq!(credit.base, 50_000);
        assert_eq!(credit.current_repayments, 500);
        assert_eq!(credit.balance_on_completion, 5_000);
    }

    #[test]
    fn odd_incomes_floor() {
        let plan = plan_income(CaseKind::CSelfJoint, 30_003).unwrap();
        let app1 = plan.applicant(1).unwrap();
        assert_eq!(app1.amount_for(FieldRole::NetProfitLastYear), Some(15_001));
        assert_eq!(app1.amount_for(FieldRole::NetProfitTwoYearsAgo), Some(7_500));
        assert_eq!(plan.credit.unwrap().current_repayments, 150);
    }

    #[test]
    fn zero_income_rejected() {
        assert_eq!(plan_income(CaseKind::ESingle, 0), Err(PlanError::ZeroIncome));
    }

    #[test]
    fn audit_lines_state_every_amount() {
        let plan = plan_income(CaseKind::CEJoint, 100_000).unwrap();
        let lines = plan.audit_lines();
        assert_eq!(lines.len(), 1 + 2 + 1);
        assert!(lines[1].contains("applicant 1: annual basic salary = £50000"));
        assert!(lines[3].contains("current repayments = £500"));
    }
}
