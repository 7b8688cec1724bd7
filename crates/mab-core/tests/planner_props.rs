use mab_core::{plan_income, CaseKind, FieldRole};
use proptest::prelude::*;

fn any_kind() -> impl Strategy<Value = CaseKind> {
    proptest::sample::select(CaseKind::ALL.to_vec())
}

#[test]
fn test_seed_case_s_joint_200k() {
    let plan = plan_income(CaseKind::SJoint, 200_000).unwrap();
    let app1 = plan.applicant(1).unwrap();
    let app2 = plan.applicant(2).unwrap();
    assert_eq!(app1.amount_for(FieldRole::NetProfitLastYear), Some(100_000));
    assert_eq!(app1.amount_for(FieldRole::NetProfitTwoYearsAgo), Some(50_000));
    assert_eq!(app2.amount_for(FieldRole::AnnualBasicSalary), Some(100_000));
}

#[test]
fn test_seed_case_c_e_single_30k() {
    let credit = plan_income(CaseKind::CESingle, 30_000).unwrap().credit.unwrap();
    assert_eq!(credit.current_repayments, 300);
    assert_eq!(credit.balance_on_completion, 3_000);
}

proptest! {
    #[test]
    fn prop_planner_is_pure(kind in any_kind(), total in 1u64..5_000_000) {
        prop_assert_eq!(plan_income(kind, total), plan_income(kind, total));
    }

    #[test]
    fn prop_applicant_count_matches_kind(kind in any_kind(), total in 1u64..5_000_000) {
        let plan = plan_income(kind, total).unwrap();
        prop_assert_eq!(plan.applicants.len(), kind.applicant_count());
        for (i, applicant) in plan.applicants.iter().enumerate() {
            prop_assert_eq!(applicant.applicant, i + 1);
            prop_assert_eq!(applicant.employment, kind.employment(i));
        }
    }

    #[test]
    fn prop_e_joint_never_writes_total(total in 2u64..5_000_000) {
        for kind in [CaseKind::EJoint, CaseKind::CEJoint] {
            let plan = plan_income(kind, total).unwrap();
            for applicant in &plan.applicants {
                prop_assert_eq!(applicant.amount_for(FieldRole::AnnualBasicSalary), Some(total / 2));
            }
            prop_assert!(plan.fields().all(|(_, f)| f.amount != total));
        }
    }

    #[test]
    fn prop_s_joint_split(total in 4u64..5_000_000) {
        for kind in [CaseKind::SJoint, CaseKind::CSelfJoint] {
            let plan = plan_income(kind, total).unwrap();
            let app1 = plan.applicant(1).unwrap();
            let app2 = plan.applicant(2).unwrap();
            prop_assert_eq!(app1.amount_for(FieldRole::NetProfitLastYear), Some(total / 2));
            prop_assert_eq!(app1.amount_for(FieldRole::NetProfitTwoYearsAgo), Some(total / 4));
            prop_assert_eq!(app1.amount_for(FieldRole::AnnualBasicSalary), None);
            prop_assert_eq!(app2.amount_for(FieldRole::AnnualBasicSalary), Some(total / 2));
        }
    }

    #[test]
    fn prop_credit_commitments(kind in any_kind(), total in 1u64..5_000_000) {
        let plan = plan_income(kind, total).unwrap();
        match plan.credit {
            Some(credit) => {
                prop_assert!(kind.has_credit_commitments());
                let base = if kind.is_joint() { total / 2 } else { total };
                prop_assert_eq!(credit.base, base);
                prop_assert_eq!(credit.current_repayments, base / 100);
                prop_assert_eq!(credit.balance_on_completion, base / 10);
            }
            None => prop_assert!(!kind.has_credit_commitments()),
        }
    }

    #[test]
    fn prop_credit_variant_shares_income_plan(kind in any_kind(), total in 1u64..5_000_000) {
        let plan = plan_income(kind, total).unwrap();
        let base = plan_income(kind.income_shape(), total).unwrap();
        prop_assert_eq!(plan.applicants, base.applicants);
    }
}
