//! Scenario and results fixtures

use crate::portal::FakeRow;
use mab_core::{CaseKind, Lender, Scenario};

/// How each panel lender is rendered, and its multiple of income in tenths
const PANEL: [(Lender, &str, u64); 16] = [
    (Lender::GenH, "Generation Home", 48),
    (Lender::Accord, "Accord", 45),
    (Lender::Barclays, "Barclays", 52),
    (Lender::Coventry, "Coventry BS", 44),
    (Lender::Halifax, "Halifax", 50),
    (Lender::Hsbc, "HSBC", 47),
    (Lender::Kensington, "Kensington Mortgages", 55),
    (Lender::Leeds, "Leeds Building Society", 43),
    (Lender::Lloyds, "Lloyds", 49),
    (Lender::Nationwide, "Nationwide", 46),
    (Lender::NatWest, "NatWest", 51),
    (Lender::Santander, "Santander", 42),
    (Lender::Skipton, "Skipton BS", 41),
    (Lender::Tsb, "TSB", 40),
    (Lender::VirginMoney, "Virgin Money", 53),
    (Lender::Yorkshire, "YBS", 45),
];

/// Halifax quotes a range; the lower end is this many tenths
const HALIFAX_LOWER: u64 = 46;

pub const UNKNOWN_LENDER: &str = "Acme Home Loans";

/// Gen H's competition rank in `panel_rows`
pub const GEN_H_RANK: u32 = 7;

/// Template reference the default catalogue uses for a case kind
#[must_use]
pub fn case_ref(kind: CaseKind) -> String {
    format!("MAB-TPL-{}", kind.label().to_uppercase().replace('.', "-"))
}

/// Scenario addressed at the default template of its kind
#[must_use]
pub fn scenario(kind: CaseKind, total_income: u64) -> Scenario {
    let id = format!(
        "{}-{:03}k",
        kind.label().replace('.', "-"),
        total_income / 1_000
    );
    Scenario::new(id, kind, total_income, case_ref(kind))
}

/// Amount the fixture panel reports for a lender
#[must_use]
pub fn expected_amount(lender: Lender, total_income: u64) -> u64 {
    PANEL
        .iter()
        .find(|(l, _, _)| *l == lender)
        .map_or(0, |(_, _, tenths)| total_income * tenths / 10)
}

/// All 16 panel lenders under varied labels, one range cell and one
/// lender outside the panel
#[must_use]
pub fn panel_rows(total_income: u64) -> Vec<FakeRow> {
    let mut rows = Vec::with_capacity(PANEL.len() + 1);
    for (i, (lender, label, tenths)) in PANEL.iter().enumerate() {
        let amount = total_income * tenths / 10;
        let cell = if *lender == Lender::Halifax {
            format!(
                "£{} to £{}",
                group_thousands(total_income * HALIFAX_LOWER / 10),
                group_thousands(amount)
            )
        } else {
            format!("£{}", group_thousands(amount))
        };
        rows.push(FakeRow::new(*label, cell));
        if i == 4 {
            rows.push(FakeRow::new(
                UNKNOWN_LENDER,
                format!("£{}", group_thousands(total_income * 6)),
            ));
        }
    }
    rows
}

/// `1234567` -> `1,234,567`
#[must_use]
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
