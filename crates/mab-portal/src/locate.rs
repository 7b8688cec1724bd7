//! Text heuristics over page snapshots
//!
//! The Portal offers no stable identifiers, so every element is found by
//! the text around it. All such rules live here; a Portal UI revision
//! should only touch this module and the lender panel.

use crate::page::{ControlDescriptor, ControlKind, InputDescriptor};
use mab_core::FieldRole;

/// Page text that means the income section is showing
pub const INCOME_MARKERS: [&str; 2] = ["annual basic salary", "net profit"];

const SALARY_LABEL: &str = "annual basic salary";
const PROFIT_LABEL: &str = "net profit";
const LAST_YEAR_WORDS: [&str; 3] = ["last", "current", "latest"];
const TWO_YEARS_WORDS: [&str; 2] = ["two", "2"];

const ADVANCE_WORDS: [&str; 3] = ["next", "continue", "save"];
const CONFIRM_WORDS: [&str; 8] = [
    "ok", "okay", "confirm", "yes", "continue", "proceed", "got it", "accept",
];
const SIGN_IN_WORDS: [&str; 4] = ["sign in", "log in", "login", "continue"];
const RECOMPUTE_WORDS: [&str; 4] = ["calculate", "recalculate", "run", "affordability"];

const UNSECURED_LABEL: &str = "unsecured";
const REPAYMENTS_LABEL: &str = "current repayments";
const BALANCE_LABEL: &str = "balance on completion";

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
}

fn normalise_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn starts_with_any(text: &str, words: &[&str]) -> bool {
    let text = normalise_text(text);
    words.iter().any(|w| {
        text == *w
            || text
                .strip_prefix(w)
                .is_some_and(|rest| rest.starts_with(|c: char| !c.is_alphanumeric()))
    })
}

/// Whether page text shows the income section
#[must_use]
pub fn has_income_markers(text: &str) -> bool {
    let text = text.to_lowercase();
    INCOME_MARKERS.iter().any(|m| text.contains(m))
}

/// Which income field an input is, judged by its label
#[must_use]
pub fn classify_income_input(input: &InputDescriptor) -> Option<FieldRole> {
    let label = if input.label.trim().is_empty() {
        input.context()
    } else {
        normalise_text(&input.label)
    };
    if label.contains(SALARY_LABEL) {
        return Some(FieldRole::AnnualBasicSalary);
    }
    if !label.contains(PROFIT_LABEL) {
        return None;
    }
    let words: Vec<&str> = tokens(&label).collect();
    if words.iter().any(|w| TWO_YEARS_WORDS.contains(w)) {
        Some(FieldRole::NetProfitTwoYearsAgo)
    } else if words.iter().any(|w| LAST_YEAR_WORDS.contains(w)) {
        Some(FieldRole::NetProfitLastYear)
    } else {
        None
    }
}

/// Visible inputs for one income role, in document order
#[must_use]
pub fn income_inputs(inputs: &[InputDescriptor], role: FieldRole) -> Vec<&InputDescriptor> {
    inputs
        .iter()
        .filter(|i| i.visible && classify_income_input(i) == Some(role))
        .collect()
}

/// The unsecured-loan inputs: (current repayments, balance on completion)
///
/// # Errors
/// Describes which field is missing or ambiguous.
pub fn find_credit_inputs(
    inputs: &[InputDescriptor],
) -> Result<(&InputDescriptor, &InputDescriptor), String> {
    let unsecured: Vec<&InputDescriptor> = inputs
        .iter()
        .filter(|i| i.visible && i.context().contains(UNSECURED_LABEL))
        .collect();
    Ok((
        pick_unique(&unsecured, REPAYMENTS_LABEL)?,
        pick_unique(&unsecured, BALANCE_LABEL)?,
    ))
}

fn pick_unique<'a>(
    candidates: &[&'a InputDescriptor],
    needle: &str,
) -> Result<&'a InputDescriptor, String> {
    let matches: Vec<&'a InputDescriptor> = candidates
        .iter()
        .copied()
        .filter(|i| i.context().contains(needle))
        .collect();
    match matches.as_slice() {
        [one] => Ok(*one),
        [] => Err(format!("no unsecured-loan input labelled '{needle}'")),
        many => Err(format!(
            "{} unsecured-loan inputs labelled '{needle}'",
            many.len()
        )),
    }
}

/// Control that moves the multi-step form forward
#[must_use]
pub fn find_advance_control(controls: &[ControlDescriptor]) -> Option<&ControlDescriptor> {
    let usable = || controls.iter().filter(|c| c.visible && !c.in_dialog);
    usable()
        .find(|c| c.kind != ControlKind::Row && starts_with_any(&c.text, &ADVANCE_WORDS))
        .or_else(|| usable().find(|c| c.kind == ControlKind::Button && c.green && c.has_play_icon))
}

/// Confirmation button of an open modal dialogue
#[must_use]
pub fn find_dialog_confirm(controls: &[ControlDescriptor]) -> Option<&ControlDescriptor> {
    controls
        .iter()
        .filter(|c| c.visible && c.in_dialog && c.kind == ControlKind::Button)
        .find(|c| starts_with_any(&c.text, &CONFIRM_WORDS))
}

/// The control that forces the Portal to recompute affordability
#[must_use]
pub fn find_recompute_control(controls: &[ControlDescriptor]) -> Option<&ControlDescriptor> {
    let buttons = || {
        controls
            .iter()
            .filter(|c| c.visible && !c.in_dialog && c.kind == ControlKind::Button)
    };
    buttons().find(|c| c.has_play_icon).or_else(|| {
        buttons().find(|c| {
            c.green && tokens(&c.text.to_lowercase()).any(|w| RECOMPUTE_WORDS.contains(&w))
        })
    })
}

/// Dashboard row (or link) whose text carries the case reference
#[must_use]
pub fn find_case_row<'a>(
    controls: &'a [ControlDescriptor],
    case_ref: &str,
) -> Option<&'a ControlDescriptor> {
    let candidates = || {
        controls
            .iter()
            .filter(|c| c.visible && !c.in_dialog && c.text.contains(case_ref))
    };
    candidates()
        .find(|c| c.kind == ControlKind::Row)
        .or_else(|| candidates().find(|c| c.kind == ControlKind::Link))
}

/// Sign-in inputs: (email, password)
#[must_use]
pub fn find_login_inputs(
    inputs: &[InputDescriptor],
) -> Option<(&InputDescriptor, &InputDescriptor)> {
    let visible = || inputs.iter().filter(|i| i.visible);
    let email = visible().find(|i| {
        i.kind == "email"
            || i.name.to_lowercase().contains("email")
            || i.context().contains("email")
    })?;
    let password = visible().find(|i| i.kind == "password")?;
    Some((email, password))
}

/// Submit control of the sign-in form
#[must_use]
pub fn find_sign_in_submit(controls: &[ControlDescriptor]) -> Option<&ControlDescriptor> {
    let usable = || controls.iter().filter(|c| c.visible && !c.in_dialog);
    usable()
        .find(|c| c.is_submit)
        .or_else(|| usable().find(|c| starts_with_any(&c.text, &SIGN_IN_WORDS)))
}

/// Strip the Portal's display formatting from a read-back value
///
/// Removes `,`, whitespace, `£` and one trailing `.00`.
#[must_use]
pub fn normalise_display_value(value: &str) -> String {
    let stripped: String = value
        .chars()
        .filter(|c| !matches!(c, ',' | '£') && !c.is_whitespace())
        .collect();
    stripped
        .strip_suffix(".00")
        .map_or(stripped.clone(), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::ElementRef;

    fn input(id: &str, label: &str, section: &str) -> InputDescriptor {
        InputDescriptor {
            element: ElementRef::new(id),
            label: label.to_string(),
            section: section.to_string(),
            kind: "text".to_string(),
            name: String::new(),
            value: String::new(),
            visible: true,
        }
    }

    fn button(id: &str, text: &str) -> ControlDescriptor {
        ControlDescriptor {
            element: ElementRef::new(id),
            kind: ControlKind::Button,
            text: text.to_string(),
            is_submit: false,
            green: false,
            has_play_icon: false,
            in_dialog: false,
            visible: true,
        }
    }

    #[test]
    fn income_markers() {
        assert!(has_income_markers("Applicant 1\nAnnual Basic Salary"));
        assert!(has_income_markers("NET PROFIT (latest year)"));
        assert!(!has_income_markers("Property details"));
    }

    #[test]
    fn classify_profit_qualifiers() {
        let cases = [
            ("Net profit - last year", Some(FieldRole::NetProfitLastYear)),
            ("Net profit (current year)", Some(FieldRole::NetProfitLastYear)),
            ("Net Profit latest", Some(FieldRole::NetProfitLastYear)),
            ("Net profit two years ago", Some(FieldRole::NetProfitTwoYearsAgo)),
            ("Net profit - year 2", Some(FieldRole::NetProfitTwoYearsAgo)),
            ("Net profit", None),
            ("Annual basic salary", Some(FieldRole::AnnualBasicSalary)),
            ("Annual bonus", None),
        ];
        for (label, expected) in cases {
            assert_eq!(classify_income_input(&input("x", label, "")), expected, "{label}");
        }
    }

    #[test]
    fn label_falls_back_to_section() {
        let i = input("x", "", "Annual Basic Salary");
        assert_eq!(classify_income_input(&i), Some(FieldRole::AnnualBasicSalary));
    }

    #[test]
    fn income_inputs_keep_document_order() {
        let inputs = vec![
            input("a", "Annual basic salary", "Applicant 1"),
            input("b", "Employer name", "Applicant 1"),
            input("c", "Annual basic salary", "Applicant 2"),
        ];
        let found = income_inputs(&inputs, FieldRole::AnnualBasicSalary);
        let ids: Vec<_> = found.iter().map(|i| i.element.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn credit_inputs_need_unsecured_context() {
        let inputs = vec![
            input("m", "Current repayments", "Mortgages"),
            input("r", "Current repayments", "Unsecured loans"),
            input("b", "Balance on completion", "Unsecured loans"),
        ];
        let (repay, balance) = find_credit_inputs(&inputs).unwrap();
        assert_eq!(repay.element.as_str(), "r");
        assert_eq!(balance.element.as_str(), "b");
    }

    #[test]
    fn credit_inputs_ambiguous_or_missing() {
        let inputs = vec![
            input("r1", "Current repayments", "Unsecured loans"),
            input("r2", "Current repayments", "Unsecured loans"),
            input("b", "Balance on completion", "Unsecured loans"),
        ];
        assert!(find_credit_inputs(&inputs).unwrap_err().contains("2 unsecured-loan"));
        let inputs = vec![input("r", "Current repayments", "Unsecured loans")];
        assert!(find_credit_inputs(&inputs).unwrap_err().contains("balance on completion"));
    }

    #[test]
    fn advance_prefers_labelled_controls() {
        let mut play = button("p", "");
        play.green = true;
        play.has_play_icon = true;
        let controls = vec![button("x", "Back"), play.clone(), button("n", "Save and continue")];
        assert_eq!(find_advance_control(&controls).unwrap().element.as_str(), "n");

        let controls = vec![button("x", "Back"), play];
        assert_eq!(find_advance_control(&controls).unwrap().element.as_str(), "p");

        // "Nextdoor" is not "next"
        assert!(find_advance_control(&[button("z", "Nextdoor")]).is_none());
    }

    #[test]
    fn dialog_confirm_only_inside_dialogs() {
        let mut ok = button("ok", "OK");
        assert!(find_dialog_confirm(std::slice::from_ref(&ok)).is_none());
        ok.in_dialog = true;
        assert_eq!(find_dialog_confirm(&[ok]).unwrap().element.as_str(), "ok");
    }

    #[test]
    fn recompute_control_prefers_play_icon() {
        let mut green = button("g", "Run affordability");
        green.green = true;
        let mut play = button("p", "");
        play.has_play_icon = true;
        assert_eq!(
            find_recompute_control(&[green.clone(), play]).unwrap().element.as_str(),
            "p"
        );
        assert_eq!(find_recompute_control(&[green]).unwrap().element.as_str(), "g");
        assert!(find_recompute_control(&[button("s", "Save")]).is_none());
    }

    #[test]
    fn case_row_by_reference() {
        let mut row = button("r", "MAB-TPL-E-JOINT  Smith & Jones  Open");
        row.kind = ControlKind::Row;
        let mut link = button("l", "MAB-TPL-E-JOINT");
        link.kind = ControlKind::Link;
        let controls = vec![link, row];
        assert_eq!(
            find_case_row(&controls, "MAB-TPL-E-JOINT").unwrap().element.as_str(),
            "r"
        );
        assert!(find_case_row(&controls, "MAB-TPL-S-JOINT").is_none());
    }

    #[test]
    fn login_inputs() {
        let mut email = input("e", "Email address", "");
        email.kind = "email".into();
        let mut password = input("p", "Password", "");
        password.kind = "password".into();
        let inputs = vec![email, password];
        let (e, p) = find_login_inputs(&inputs).unwrap();
        assert_eq!((e.element.as_str(), p.element.as_str()), ("e", "p"));
    }

    #[test]
    fn display_values_normalise() {
        assert_eq!(normalise_display_value("£30,000"), "30000");
        assert_eq!(normalise_display_value(" 30 000.00 "), "30000");
        assert_eq!(normalise_display_value("30000.50"), "30000.50");
        assert_eq!(normalise_display_value(""), "");
    }
}
