//! Calendar period keys derived from record dates.
//!
//! Every aggregation that cares about time goes through [`period_key`], so
//! month, quarter and year keys always agree on where a period starts and how
//! periods sort.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize, Serializer};

// ── Quarter ───────────────────────────────────────────────────────────────────

/// Calendar quarter, `Q1` = January–March.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    /// `ceil(month / 3)`; `None` outside 1–12.
    pub fn from_month(month: u32) -> Option<Self> {
        match month {
            1..=3 => Some(Quarter::Q1),
            4..=6 => Some(Quarter::Q2),
            7..=9 => Some(Quarter::Q3),
            10..=12 => Some(Quarter::Q4),
            _ => None,
        }
    }

    /// 1-based quarter number.
    pub fn number(self) -> u32 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 2,
            Quarter::Q3 => 3,
            Quarter::Q4 => 4,
        }
    }

    fn from_number(n: u32) -> Option<Self> {
        Self::from_month(n * 3)
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

impl FromStr for Quarter {
    type Err = String;

    /// Accepts `Q3`, `q3` or a bare `3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('Q')
            .or_else(|| trimmed.strip_prefix('q'))
            .unwrap_or(trimmed);
        digits
            .parse::<u32>()
            .ok()
            .filter(|n| (1..=4).contains(n))
            .and_then(Quarter::from_number)
            .ok_or_else(|| format!("invalid quarter: {s}"))
    }
}

// ── Granularity ───────────────────────────────────────────────────────────────

/// Width of a calendar period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Month,
    Quarter,
    Year,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Granularity::Month => "month",
            Granularity::Quarter => "quarter",
            Granularity::Year => "year",
        };
        f.write_str(name)
    }
}

// ── PeriodKey ─────────────────────────────────────────────────────────────────

/// A calendar-aligned period identifier.
///
/// Keys of the same granularity order chronologically. Comparing keys of
/// different granularities is meaningless; callers never mix them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeriodKey {
    Year(i32),
    Quarter(i32, Quarter),
    /// Year and month (1–12).
    Month(i32, u32),
}

/// Derive the period containing `date` at the given granularity.
pub fn period_key(date: NaiveDate, granularity: Granularity) -> PeriodKey {
    PeriodKey::of(date, granularity)
}

impl PeriodKey {
    /// See [`period_key`].
    pub fn of(date: NaiveDate, granularity: Granularity) -> Self {
        let year = date.year();
        match granularity {
            Granularity::Year => PeriodKey::Year(year),
            Granularity::Quarter => {
                // chrono guarantees month() in 1..=12
                let quarter = Quarter::from_month(date.month()).unwrap_or(Quarter::Q4);
                PeriodKey::Quarter(year, quarter)
            }
            Granularity::Month => PeriodKey::Month(year, date.month()),
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            PeriodKey::Year(_) => Granularity::Year,
            PeriodKey::Quarter(..) => Granularity::Quarter,
            PeriodKey::Month(..) => Granularity::Month,
        }
    }

    pub fn year(&self) -> i32 {
        match *self {
            PeriodKey::Year(y) | PeriodKey::Quarter(y, _) | PeriodKey::Month(y, _) => y,
        }
    }

    /// The immediately preceding calendar period of the same granularity.
    pub fn previous(&self) -> Self {
        match *self {
            PeriodKey::Year(y) => PeriodKey::Year(y - 1),
            PeriodKey::Quarter(y, q) => match q {
                Quarter::Q1 => PeriodKey::Quarter(y - 1, Quarter::Q4),
                Quarter::Q2 => PeriodKey::Quarter(y, Quarter::Q1),
                Quarter::Q3 => PeriodKey::Quarter(y, Quarter::Q2),
                Quarter::Q4 => PeriodKey::Quarter(y, Quarter::Q3),
            },
            PeriodKey::Month(y, 1) => PeriodKey::Month(y - 1, 12),
            PeriodKey::Month(y, m) => PeriodKey::Month(y, m - 1),
        }
    }

    /// Whether `date` falls inside this period.
    pub fn contains(&self, date: NaiveDate) -> bool {
        PeriodKey::of(date, self.granularity()) == *self
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodKey::Year(y) => write!(f, "{y}"),
            PeriodKey::Quarter(y, q) => write!(f, "{y}-{q}"),
            PeriodKey::Month(y, m) => write!(f, "{y}-{m:02}"),
        }
    }
}

impl Serialize for PeriodKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
