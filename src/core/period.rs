//! Calendar periods: composite month and quarter keys plus the free-text
//! period label parser for the housing workbook.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::LazyLock;

/// A calendar month identified by its (year, month) pair.
///
/// The derived `Ord` is chronological, so a `BTreeMap<YearMonth, _>` emits
/// series in ascending calendar order without a separate sort.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        debug_assert!((1..=12).contains(&month));
        Self { year, month }
    }

    /// Flat month offset (`year*12 + month-1`). Differences of flat indices
    /// count calendar months between two keys.
    pub fn flat_index(self) -> i32 {
        self.year * 12 + (self.month as i32 - 1)
    }

    pub fn from_flat_index(index: i32) -> Self {
        Self {
            year: index.div_euclid(12),
            month: (index.rem_euclid(12) + 1) as u32,
        }
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// A calendar quarter (Q1 = Jan-Mar .. Q4 = Oct-Dec).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct YearQuarter {
    pub year: i32,
    pub quarter: u32,
}

impl YearQuarter {
    pub fn new(year: i32, quarter: u32) -> Self {
        debug_assert!((1..=4).contains(&quarter));
        Self { year, quarter }
    }

    pub fn first_month(self) -> u32 {
        (self.quarter - 1) * 3 + 1
    }

    /// The three constituent months of the quarter.
    pub fn months(self) -> [YearMonth; 3] {
        let first = self.first_month();
        [
            YearMonth::new(self.year, first),
            YearMonth::new(self.year, first + 1),
            YearMonth::new(self.year, first + 2),
        ]
    }

    /// Middle month of the quarter, the representative point used when
    /// bridging gaps between quarterly anchors.
    pub fn mid_month(self) -> YearMonth {
        YearMonth::new(self.year, self.first_month() + 1)
    }
}

impl Display for YearQuarter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Q{} {}", self.quarter, self.year)
    }
}

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(20\d{2})\b").unwrap());
static ROMAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([ivIV]+)\s+(?:20\d{2})").unwrap());
static Q_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"q([1-4])").unwrap());
static KW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([1-4iv]+)\s*kw").unwrap());

fn roman_quarter(token: &str) -> Option<u32> {
    match token {
        "i" => Some(1),
        "ii" => Some(2),
        "iii" => Some(3),
        "iv" => Some(4),
        _ => None,
    }
}

/// Parse a period label like `"Q1 2023"`, `"I 2006"`, `"1 kw. 2023"` or
/// `"IV kw 2021"` into a quarter.
///
/// A 4-digit year is required. Quarter detection tries, in order: a Roman
/// numeral directly before the year, `Q` plus a digit, and the Polish `kw`
/// abbreviation preceded by an Arabic or Roman numeral. The first rule that
/// resolves wins; `None` if the year or every quarter rule fails.
pub fn parse_quarter_label(label: &str) -> Option<YearQuarter> {
    let year: i32 = YEAR_RE.captures(label)?.get(1)?.as_str().parse().ok()?;
    let lower = label.to_lowercase();

    let quarter = ROMAN_RE
        .captures(label)
        .and_then(|c| roman_quarter(&c[1].to_lowercase()))
        .or_else(|| Q_RE.captures(&lower).and_then(|c| c[1].parse().ok()))
        .or_else(|| {
            KW_RE.captures(&lower).and_then(|c| {
                let token = &c[1];
                roman_quarter(token)
                    .or_else(|| token.parse().ok().filter(|q| (1..=4).contains(q)))
            })
        })?;

    Some(YearQuarter::new(year, quarter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_label_formats() {
        assert_eq!(parse_quarter_label("Q1 2023"), Some(YearQuarter::new(2023, 1)));
        assert_eq!(parse_quarter_label("I 2006"), Some(YearQuarter::new(2006, 1)));
        assert_eq!(parse_quarter_label("1 kw. 2023"), Some(YearQuarter::new(2023, 1)));
        assert_eq!(parse_quarter_label("IV kw 2021"), Some(YearQuarter::new(2021, 4)));
        assert_eq!(parse_quarter_label("III 2015"), Some(YearQuarter::new(2015, 3)));
        assert_eq!(parse_quarter_label("q4 2020"), Some(YearQuarter::new(2020, 4)));
        assert_eq!(parse_quarter_label("ii kw. 2014"), Some(YearQuarter::new(2014, 2)));
    }

    #[test]
    fn test_parse_requires_year() {
        assert_eq!(parse_quarter_label("Q1"), None);
        assert_eq!(parse_quarter_label("IV kw."), None);
    }

    #[test]
    fn test_parse_requires_quarter() {
        assert_eq!(parse_quarter_label("2023"), None);
        assert_eq!(parse_quarter_label("rok 2023"), None);
    }

    #[test]
    fn test_roman_rule_beats_kw_rule() {
        // The Roman-numeral-before-year rule resolves first; the "kw" token
        // earlier in the label is never consulted
        assert_eq!(parse_quarter_label("IV kw. I 2019"), Some(YearQuarter::new(2019, 1)));
    }

    #[test]
    fn test_flat_index_round_trip() {
        for year in [2006, 2013, 2021] {
            for month in 1..=12 {
                let ym = YearMonth::new(year, month);
                assert_eq!(YearMonth::from_flat_index(ym.flat_index()), ym);
            }
        }
        // December to January crosses a year boundary in one step
        let dec = YearMonth::new(2020, 12);
        assert_eq!(YearMonth::from_flat_index(dec.flat_index() + 1), YearMonth::new(2021, 1));
    }

    #[test]
    fn test_quarter_months() {
        assert_eq!(
            YearQuarter::new(2020, 1).months(),
            [YearMonth::new(2020, 1), YearMonth::new(2020, 2), YearMonth::new(2020, 3)]
        );
        assert_eq!(YearQuarter::new(2020, 4).mid_month(), YearMonth::new(2020, 11));
    }
}
