//! Income and credit-commitment writing
//!
//! Inputs are matched to planned fields by label: the n-th input of a
//! role belongs to the n-th applicant in the plan that has that role.
//! For `S.Joint` this puts App2's salary in the first salary input.
//! The page is re-read before each field since later inputs may only
//! appear once earlier ones validate.

use crate::error::PortalError;
use crate::locate;
use crate::page::PortalPage;
use crate::writer::FieldWriter;
use mab_core::{CreditCommitments, FieldRole, IncomePlan};
use std::collections::HashMap;
use tracing::info;

/// One verified write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenField {
    /// 1-based applicant, 0 for credit fields
    pub applicant: usize,
    pub field: String,
    pub amount: u64,
}

/// Write every planned income field
///
/// # Errors
/// - `PortalError::IncomeFieldNotFound` when the page has fewer inputs of
///   a role than the plan needs
/// - `PortalError::FieldWriteMismatch` from the writer
pub async fn write_income<P: PortalPage + ?Sized>(
    page: &P,
    writer: &FieldWriter,
    plan: &IncomePlan,
) -> Result<Vec<WrittenField>, PortalError> {
    let mut next_index: HashMap<FieldRole, usize> = HashMap::new();
    let mut written = Vec::with_capacity(plan.applicants.len() * 2);

    for (applicant, planned) in plan.fields() {
        let inputs = page.inputs().await?;
        let index = next_index.entry(planned.role).or_insert(0);
        let candidates = locate::income_inputs(&inputs, planned.role);
        let input = candidates.get(*index).ok_or(PortalError::IncomeFieldNotFound {
            applicant,
            role: planned.role,
        })?;
        *index += 1;

        let field = format!("applicant {applicant} {}", planned.role);
        writer
            .write_number(page, &input.element, &field, planned.amount)
            .await?;
        info!(
            applicant,
            role = %planned.role,
            amount = planned.amount,
            total_income = plan.total_income,
            "Income field written"
        );
        written.push(WrittenField {
            applicant,
            field,
            amount: planned.amount,
        });
    }

    Ok(written)
}

/// Write the unsecured-loan commitments of a `C.*` scenario
///
/// # Errors
/// - `PortalError::CreditFieldNotFound` when either input is missing or
///   ambiguous
/// - `PortalError::FieldWriteMismatch` from the writer
pub async fn write_credit<P: PortalPage + ?Sized>(
    page: &P,
    writer: &FieldWriter,
    credit: &CreditCommitments,
) -> Result<Vec<WrittenField>, PortalError> {
    let inputs = page.inputs().await?;
    let (repayments, balance) =
        locate::find_credit_inputs(&inputs).map_err(PortalError::CreditFieldNotFound)?;
    let (repayments, balance) = (repayments.element.clone(), balance.element.clone());

    let mut written = Vec::with_capacity(2);
    for (element, field, amount) in [
        (&repayments, "unsecured current repayments", credit.current_repayments),
        (&balance, "unsecured balance on completion", credit.balance_on_completion),
    ] {
        writer.write_number(page, element, field, amount).await?;
        info!(field, amount, base = credit.base, "Credit field written");
        written.push(WrittenField {
            applicant: 0,
            field: field.to_string(),
            amount,
        });
    }
    Ok(written)
}
