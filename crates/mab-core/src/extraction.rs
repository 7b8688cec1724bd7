//! Lender extraction from results snapshots
//!
//! Two paths, both deterministic for identical input:
//! 1. The affordability table (header cells containing "lender" and
//!    "affordable"); one label cell and one amount cell per row.
//! 2. A text fallback scanning page lines for `<alias> ... £<amount>`.
//!    Results from this path are tagged `TextFallback`.
//!
//! Amounts outside the plausibility band are discarded; the first valid
//! amount per canonical lender is kept.

use crate::amounts::{is_plausible_amount, parse_amount};
use crate::panel::{LenderAmounts, LenderPanel};
use crate::types::ExtractionSource;
use serde::{Deserialize, Serialize};

/// Header tokens identifying the results table
pub const LENDER_HEADER: &str = "lender";
pub const AMOUNT_HEADER: &str = "affordable";

/// Cell text of one rendered table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsTable {
    /// Header cells (from `thead`, or the first row)
    pub header: Vec<String>,
    /// Body rows, header excluded
    pub rows: Vec<Vec<String>>,
}

impl ResultsTable {
    #[must_use]
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    /// Column indexes of the lender label and affordable amount
    #[must_use]
    pub fn columns(&self) -> Option<(usize, usize)> {
        let find = |token: &str| {
            self.header
                .iter()
                .position(|cell| cell.to_lowercase().contains(token))
        };
        Some((find(LENDER_HEADER)?, find(AMOUNT_HEADER)?))
    }

    /// Whether this is the affordability results table
    #[inline]
    #[must_use]
    pub fn is_results_table(&self) -> bool {
        self.columns().is_some()
    }
}

/// Outcome of one extraction pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub amounts: LenderAmounts,
    pub source: ExtractionSource,
    /// Rows (or lines) inspected
    pub rows_seen: usize,
    /// Rows whose label matched no alias
    pub rows_unmatched: usize,
    /// Rows with a missing or implausible amount
    pub rows_rejected: usize,
}

impl Extraction {
    fn empty(source: ExtractionSource) -> Self {
        Self {
            amounts: LenderAmounts::new(),
            source,
            rows_seen: 0,
            rows_unmatched: 0,
            rows_rejected: 0,
        }
    }

    /// Number of canonical lenders found
    #[inline]
    #[must_use]
    pub fn lender_count(&self) -> usize {
        self.amounts.len()
    }
}

/// Extract lender amounts from the results table
///
/// Returns `None` if the table lacks the lender/affordable header cells.
#[must_use]
pub fn extract_from_table(panel: &LenderPanel, table: &ResultsTable) -> Option<Extraction> {
    let (label_col, amount_col) = table.columns()?;
    let mut extraction = Extraction::empty(ExtractionSource::Table);

    for row in &table.rows {
        extraction.rows_seen += 1;
        let (Some(label), Some(cell)) = (row.get(label_col), row.get(amount_col)) else {
            extraction.rows_rejected += 1;
            continue;
        };
        let Some(lender) = panel.canonicalise(label) else {
            extraction.rows_unmatched += 1;
            continue;
        };
        match parse_amount(cell).filter(|a| is_plausible_amount(*a)) {
            Some(amount) => {
                extraction.amounts.insert_first(lender, amount);
            }
            None => extraction.rows_rejected += 1,
        }
    }

    Some(extraction)
}

/// Extract lender amounts from raw page text, line by line
#[must_use]
pub fn extract_from_text(panel: &LenderPanel, text: &str) -> Extraction {
    let mut extraction = Extraction::empty(ExtractionSource::TextFallback);

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some((lender, alias_end)) = panel.find(line) else {
            continue;
        };
        extraction.rows_seen += 1;
        match parse_amount(&line[alias_end..]).filter(|a| is_plausible_amount(*a)) {
            Some(amount) => {
                extraction.amounts.insert_first(lender, amount);
            }
            None => extraction.rows_rejected += 1,
        }
    }

    extraction
}

/// Pick the results table among all tables on the page
#[must_use]
pub fn find_results_table(tables: &[ResultsTable]) -> Option<&ResultsTable> {
    tables.iter().find(|t| t.is_results_table())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::Lender;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    fn sample_table() -> ResultsTable {
        ResultsTable::new(
            cells(&["", "Lender", "Product", "Affordable amount"]),
            vec![
                cells(&["1", "Generation Home", "Resi", "£260,000"]),
                cells(&["2", "Halifax", "Resi", "£75,000 to £100,000"]),
                cells(&["3", "Monzo", "Resi", "£300,000"]),
                cells(&["4", "TSB", "Resi", "£5,000"]),
                cells(&["5", "Gen H", "Resi", "£999,999"]),
                cells(&["6", "Barclays"]),
            ],
        )
    }

    #[test]
    fn table_extraction_normalises_and_validates() {
        let panel = LenderPanel::standard();
        let extraction = extract_from_table(panel, &sample_table()).unwrap();

        assert_eq!(extraction.source, ExtractionSource::Table);
        assert_eq!(extraction.amounts.get(Lender::GenH), Some(260_000));
        assert_eq!(extraction.amounts.get(Lender::Halifax), Some(100_000));
        assert_eq!(extraction.amounts.get(Lender::Tsb), None);
        assert_eq!(extraction.lender_count(), 2);
        assert_eq!(extraction.rows_seen, 6);
        assert_eq!(extraction.rows_unmatched, 1);
        assert_eq!(extraction.rows_rejected, 2);
    }

    #[test]
    fn table_without_headers_is_not_results() {
        let table = ResultsTable::new(cells(&["Name", "Value"]), vec![]);
        assert!(!table.is_results_table());
        assert!(extract_from_table(LenderPanel::standard(), &table).is_none());
    }

    #[test]
    fn finds_results_table_among_many() {
        let other = ResultsTable::new(cells(&["Case", "Status"]), vec![]);
        let tables = vec![other, sample_table()];
        let found = find_results_table(&tables).unwrap();
        assert_eq!(found.rows.len(), 6);
    }

    #[test]
    fn text_fallback_reads_lines() {
        let text = "Results\nGen H\t£250,000\nHalifax residential £75,000 to £120,000\nUnknown Bank £300,000\nNationwide £1,000\n";
        let extraction = extract_from_text(LenderPanel::standard(), text);

        assert_eq!(extraction.source, ExtractionSource::TextFallback);
        assert_eq!(extraction.amounts.get(Lender::GenH), Some(250_000));
        assert_eq!(extraction.amounts.get(Lender::Halifax), Some(120_000));
        assert_eq!(extraction.amounts.get(Lender::Nationwide), None);
        assert_eq!(extraction.lender_count(), 2);
    }

    #[test]
    fn text_fallback_ignores_amount_before_alias() {
        let extraction = extract_from_text(LenderPanel::standard(), "£250,000 offered by Halifax");
        assert!(extraction.amounts.is_empty());
        assert_eq!(extraction.rows_rejected, 1);
    }

    #[test]
    fn extraction_is_deterministic() {
        let panel = LenderPanel::standard();
        let a = extract_from_table(panel, &sample_table());
        let b = extract_from_table(panel, &sample_table());
        assert_eq!(a, b);
    }
}
