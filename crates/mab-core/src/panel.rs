//! Canonical lender panel
//!
//! The Portal renders lender labels inconsistently ("Generation Home",
//! "genH", "Coventry BS", ...). Every label is normalised to one canonical
//! name by matching a per-lender alias list, case-insensitively, on word
//! boundaries. Lenders and aliases are tried in panel order; the first
//! match wins. Labels that match nothing are dropped, never coerced.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// A canonical panel lender
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Lender {
    GenH,
    Accord,
    Barclays,
    Coventry,
    Halifax,
    Hsbc,
    Kensington,
    Leeds,
    Lloyds,
    Nationwide,
    NatWest,
    Santander,
    Skipton,
    Tsb,
    VirginMoney,
    Yorkshire,
}

impl Lender {
    /// Panel order (also alias matching order)
    pub const ALL: [Lender; 16] = [
        Lender::GenH,
        Lender::Accord,
        Lender::Barclays,
        Lender::Coventry,
        Lender::Halifax,
        Lender::Hsbc,
        Lender::Kensington,
        Lender::Leeds,
        Lender::Lloyds,
        Lender::Nationwide,
        Lender::NatWest,
        Lender::Santander,
        Lender::Skipton,
        Lender::Tsb,
        Lender::VirginMoney,
        Lender::Yorkshire,
    ];

    /// Canonical spelling used in every output
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Lender::GenH => "Gen H",
            Lender::Accord => "Accord Mortgages",
            Lender::Barclays => "Barclays",
            Lender::Coventry => "Coventry Building Society",
            Lender::Halifax => "Halifax",
            Lender::Hsbc => "HSBC",
            Lender::Kensington => "Kensington",
            Lender::Leeds => "Leeds Building Society",
            Lender::Lloyds => "Lloyds Bank",
            Lender::Nationwide => "Nationwide",
            Lender::NatWest => "NatWest",
            Lender::Santander => "Santander",
            Lender::Skipton => "Skipton Building Society",
            Lender::Tsb => "TSB",
            Lender::VirginMoney => "Virgin Money",
            Lender::Yorkshire => "Yorkshire Building Society",
        }
    }

    /// Labels the Portal is known to render for this lender
    #[must_use]
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Lender::GenH => &["Gen H", "Generation Home", "genH", "Gen-H"],
            Lender::Accord => &["Accord Mortgages", "Accord"],
            Lender::Barclays => &["Barclays"],
            Lender::Coventry => &["Coventry Building Society", "Coventry BS", "Coventry"],
            Lender::Halifax => &["Halifax"],
            Lender::Hsbc => &["HSBC"],
            Lender::Kensington => &["Kensington Mortgages", "Kensington"],
            Lender::Leeds => &["Leeds Building Society", "Leeds BS", "Leeds"],
            Lender::Lloyds => &["Lloyds Bank", "Lloyds"],
            Lender::Nationwide => &["Nationwide Building Society", "Nationwide"],
            Lender::NatWest => &["NatWest", "Nat West", "National Westminster"],
            Lender::Santander => &["Santander"],
            Lender::Skipton => &["Skipton Building Society", "Skipton BS", "Skipton"],
            Lender::Tsb => &["TSB"],
            Lender::VirginMoney => &["Virgin Money", "Virgin"],
            Lender::Yorkshire => &["Yorkshire Building Society", "Yorkshire BS", "YBS"],
        }
    }

    /// Lookup by canonical name (exact, as written by `name()`)
    #[must_use]
    pub fn from_name(name: &str) -> Option<Lender> {
        Lender::ALL.into_iter().find(|l| l.name() == name)
    }
}

impl fmt::Display for Lender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Lender {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Lender {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Lender::from_name(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("not a panel lender: {name}")))
    }
}

/// Compiled alias matchers for the panel
#[derive(Debug)]
pub struct LenderPanel {
    matchers: Vec<(Lender, Vec<Regex>)>,
}

static STANDARD: Lazy<LenderPanel> = Lazy::new(LenderPanel::build);

impl LenderPanel {
    /// The shared standard panel
    #[inline]
    #[must_use]
    pub fn standard() -> &'static LenderPanel {
        &STANDARD
    }

    fn build() -> Self {
        let matchers = Lender::ALL
            .into_iter()
            .map(|lender| {
                let patterns = lender
                    .aliases()
                    .iter()
                    .map(|alias| alias_regex(alias))
                    .collect();
                (lender, patterns)
            })
            .collect();
        Self { matchers }
    }

    /// Number of canonical lenders
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Normalise a label to its canonical lender
    #[must_use]
    pub fn canonicalise(&self, label: &str) -> Option<Lender> {
        self.find(label).map(|(lender, _)| lender)
    }

    /// First matching lender and the byte offset where its alias ends
    #[must_use]
    pub fn find(&self, text: &str) -> Option<(Lender, usize)> {
        self.matchers.iter().find_map(|(lender, patterns)| {
            patterns
                .iter()
                .find_map(|re| re.find(text))
                .map(|m| (*lender, m.end()))
        })
    }

    /// Every distinct lender mentioned anywhere in `text`
    #[must_use]
    pub fn lenders_in_text(&self, text: &str) -> BTreeSet<Lender> {
        self.matchers
            .iter()
            .filter(|(_, patterns)| patterns.iter().any(|re| re.is_match(text)))
            .map(|(lender, _)| *lender)
            .collect()
    }
}

fn alias_regex(alias: &str) -> Regex {
    let body = alias
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    // Escaped aliases always form a valid pattern
    Regex::new(&format!(r"(?i)\b{body}\b")).expect("alias pattern")
}

/// Canonical lender -> affordability amount, in extraction order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LenderAmounts(IndexMap<Lender, u64>);

impl LenderAmounts {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an amount unless the lender already has one
    ///
    /// Returns `true` when the amount was kept.
    pub fn insert_first(&mut self, lender: Lender, amount: u64) -> bool {
        if self.0.contains_key(&lender) {
            return false;
        }
        self.0.insert(lender, amount);
        true
    }

    #[inline]
    #[must_use]
    pub fn get(&self, lender: Lender) -> Option<u64> {
        self.0.get(&lender).copied()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Lender, u64)> + '_ {
        self.0.iter().map(|(l, a)| (*l, *a))
    }

    /// Amounts sorted descending (ties keep extraction order)
    #[must_use]
    pub fn sorted_desc(&self) -> Vec<(Lender, u64)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
    }
}

impl FromIterator<(Lender, u64)> for LenderAmounts {
    fn from_iter<I: IntoIterator<Item = (Lender, u64)>>(iter: I) -> Self {
        let mut amounts = LenderAmounts::new();
        for (lender, amount) in iter {
            amounts.insert_first(lender, amount);
        }
        amounts
    }
}
