//! Declarative filter parameters handed over by the UI layer.
//!
//! Evaluation against a record store lives in `regdash_data::filter`; this
//! module only defines what a filter *is* and how a single record is matched.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::{month_start, RegistrationRecord};

// ── Selector ──────────────────────────────────────────────────────────────────

/// An exact-match selector where `All` imposes no constraint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Selector {
    #[default]
    All,
    Only(String),
}

impl Selector {
    /// `"All"` (any case) or an empty string select everything.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Selector::All
        } else {
            Selector::Only(trimmed.to_string())
        }
    }

    pub fn only(value: impl Into<String>) -> Self {
        Selector::Only(value.into())
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Selector::All => true,
            Selector::Only(wanted) => wanted == value,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selector::All)
    }
}

// ── DateRange ─────────────────────────────────────────────────────────────────

/// Inclusive range of months.
///
/// Both bounds are truncated to the first day of their month, so a range
/// includes every month it touches. `start > end` selects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: truncate_to_month(start),
            end: truncate_to_month(end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let month = truncate_to_month(date);
        self.start <= month && month <= self.end
    }
}

fn truncate_to_month(date: NaiveDate) -> NaiveDate {
    month_start(date.year(), date.month()).unwrap_or(date)
}

// ── FilterSpec ────────────────────────────────────────────────────────────────

/// One query's worth of filter parameters. All constraints are ANDed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FilterSpec {
    pub date_range: Option<DateRange>,
    pub vehicle_category: Selector,
    pub manufacturer: Selector,
}

impl FilterSpec {
    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some(DateRange::new(start, end));
        self
    }

    pub fn with_vehicle_category(mut self, category: impl Into<String>) -> Self {
        self.vehicle_category = Selector::Only(category.into());
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Selector::Only(manufacturer.into());
        self
    }

    /// True when the filter lets every record through.
    pub fn is_unfiltered(&self) -> bool {
        self.date_range.is_none() && self.vehicle_category.is_all() && self.manufacturer.is_all()
    }

    pub fn matches(&self, record: &RegistrationRecord) -> bool {
        self.date_range.map_or(true, |r| r.contains(record.date))
            && self.vehicle_category.matches(&record.vehicle_category)
            && self.manufacturer.matches(&record.manufacturer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(date: NaiveDate, category: &str, manufacturer: &str) -> RegistrationRecord {
        RegistrationRecord {
            date,
            vehicle_category: category.to_string(),
            manufacturer: manufacturer.to_string(),
            registrations: 1,
        }
    }

    #[test]
    fn test_selector_parse() {
        assert_eq!(Selector::parse("All"), Selector::All);
        assert_eq!(Selector::parse("all"), Selector::All);
        assert_eq!(Selector::parse(""), Selector::All);
        assert_eq!(Selector::parse(" 2W "), Selector::only("2W"));
    }

    #[test]
    fn test_selector_is_exact_match() {
        let hero = Selector::only("Hero");
        assert!(hero.matches("Hero"));
        assert!(!hero.matches("Hero MotoCorp"));
        assert!(!hero.matches("hero"));
        assert!(Selector::All.matches("anything"));
    }

    #[test]
    fn test_date_range_is_inclusive_by_month() {
        let range = DateRange::new(ymd(2023, 1, 15), ymd(2023, 3, 5));
        assert!(range.contains(ymd(2023, 1, 1)));
        assert!(range.contains(ymd(2023, 3, 1)));
        assert!(!range.contains(ymd(2022, 12, 1)));
        assert!(!range.contains(ymd(2023, 4, 1)));
    }

    #[test]
    fn test_date_range_reversed_is_empty() {
        let range = DateRange::new(ymd(2023, 6, 1), ymd(2023, 1, 1));
        assert!(!range.contains(ymd(2023, 3, 1)));
        assert!(!range.contains(ymd(2023, 6, 1)));
    }

    #[test]
    fn test_filter_spec_conjunction() {
        let spec = FilterSpec::default()
            .with_date_range(ymd(2023, 1, 1), ymd(2023, 12, 1))
            .with_vehicle_category("2W")
            .with_manufacturer("Hero");

        assert!(spec.matches(&record(ymd(2023, 5, 1), "2W", "Hero")));
        assert!(!spec.matches(&record(ymd(2022, 5, 1), "2W", "Hero")));
        assert!(!spec.matches(&record(ymd(2023, 5, 1), "3W", "Hero")));
        assert!(!spec.matches(&record(ymd(2023, 5, 1), "2W", "Honda")));
    }

    #[test]
    fn test_default_spec_is_unfiltered() {
        let spec = FilterSpec::default();
        assert!(spec.is_unfiltered());
        assert!(spec.matches(&record(ymd(1999, 1, 1), "4W", "Kia")));
        assert!(!spec.with_manufacturer("Kia").is_unfiltered());
    }
}
