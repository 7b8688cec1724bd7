//! Currency amount parsing
//!
//! Affordability cells come as a single literal (`£245,000`), a range
//! (`£75,000 to £100,000`) or text with an embedded literal. Ranges resolve
//! to their upper endpoint. Pence are truncated.

use once_cell::sync::Lazy;
use regex::Regex;

/// Smallest plausible affordability figure
pub const MIN_AMOUNT: u64 = 10_000;

/// Largest plausible affordability figure
pub const MAX_AMOUNT: u64 = 2_000_000;

/// Currency sigil counted by the results waiter
pub const CURRENCY_SIGIL: char = '£';

const NUMBER: &str = r"(\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{1,2})?";

// Upper endpoint must look like money, so "£250,000 - 4.5x" is not a range
const UPPER_NUMBER: &str = r"(\d{1,3}(?:,\d{3})+|\d{4,})(?:\.\d{1,2})?";

static RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)£\s*{NUMBER}\s*(?:to|-|–|—)\s*£?\s*{UPPER_NUMBER}"
    ))
    .expect("range pattern")
});

static LITERAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"£\s*{NUMBER}")).expect("literal pattern"));

/// Parse the affordability figure in a cell
///
/// Returns the upper endpoint of a range, otherwise the first currency
/// literal. Plausibility is not checked here.
#[must_use]
pub fn parse_amount(cell: &str) -> Option<u64> {
    if let Some(caps) = RANGE_RE.captures(cell) {
        return caps.get(2).and_then(|m| to_integer(m.as_str()));
    }
    LITERAL_RE
        .captures(cell)
        .and_then(|caps| caps.get(1))
        .and_then(|m| to_integer(m.as_str()))
}

/// Whether an amount is inside the accepted band
#[inline]
#[must_use]
pub fn is_plausible_amount(amount: u64) -> bool {
    (MIN_AMOUNT..=MAX_AMOUNT).contains(&amount)
}

/// Occurrences of the currency sigil in page text
#[inline]
#[must_use]
pub fn count_sigils(text: &str) -> usize {
    text.chars().filter(|c| *c == CURRENCY_SIGIL).count()
}

fn to_integer(digits: &str) -> Option<u64> {
    digits.replace(',', "").parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_literal() {
        assert_eq!(parse_amount("£245,000"), Some(245_000));
        assert_eq!(parse_amount("Max: £ 180000.50 (5.5x)"), Some(180_000));
    }

    #[test]
    fn range_takes_upper_endpoint() {
        assert_eq!(parse_amount("£75,000 to £100,000"), Some(100_000));
        assert_eq!(parse_amount("£75,000 - £100,000"), Some(100_000));
        assert_eq!(parse_amount("£75,000 – 100,000"), Some(100_000));
        assert_eq!(parse_amount("£250,000 - 4.5x income"), Some(250_000));
    }

    #[test]
    fn no_currency_literal() {
        assert_eq!(parse_amount("Refer"), None);
        assert_eq!(parse_amount("245000"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn plausibility_band() {
        assert!(is_plausible_amount(10_000));
        assert!(is_plausible_amount(2_000_000));
        assert!(!is_plausible_amount(9_999));
        assert!(!is_plausible_amount(2_000_001));
    }

    #[test]
    fn sigils_counted() {
        assert_eq!(count_sigils("£1 £2 no £3"), 3);
        assert_eq!(count_sigils("none"), 0);
    }
}
