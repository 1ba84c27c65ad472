use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::period::{Granularity, PeriodKey, Quarter};

// ── RawRecord ─────────────────────────────────────────────────────────────────

/// One untrusted registration row as handed over by data acquisition.
///
/// Column names of the SIAM-style exports (`Date`, `Vehicle_Type`, ...) are
/// accepted as aliases. Any other column is rejected when deserializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRecord {
    #[serde(alias = "Date")]
    pub date: String,
    #[serde(
        alias = "Vehicle_Type",
        alias = "vehicle_type",
        alias = "Vehicle_Category"
    )]
    pub vehicle_category: String,
    #[serde(alias = "Manufacturer")]
    pub manufacturer: String,
    #[serde(alias = "Registrations")]
    pub registrations: i64,
    #[serde(default, alias = "Year", skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, alias = "Month", skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(default, alias = "Quarter", skip_serializing_if = "Option::is_none")]
    pub quarter: Option<String>,
    /// Accepted for compatibility with existing exports, then discarded.
    #[serde(default, alias = "Data_Source", skip_serializing)]
    pub data_source: Option<String>,
}

impl RawRecord {
    /// Build a row with only the required columns.
    pub fn new(
        date: impl Into<String>,
        vehicle_category: impl Into<String>,
        manufacturer: impl Into<String>,
        registrations: i64,
    ) -> Self {
        Self {
            date: date.into(),
            vehicle_category: vehicle_category.into(),
            manufacturer: manufacturer.into(),
            registrations,
            year: None,
            month: None,
            quarter: None,
            data_source: None,
        }
    }

    /// Check the row against the schema and convert it into a typed record.
    ///
    /// `row` is only used for error context.
    pub fn validate(&self, row: usize) -> Result<RegistrationRecord, ValidationError> {
        let vehicle_category = self.vehicle_category.trim();
        if vehicle_category.is_empty() {
            return Err(ValidationError::MissingField {
                row,
                field: "vehicle_category",
            });
        }
        let manufacturer = self.manufacturer.trim();
        if manufacturer.is_empty() {
            return Err(ValidationError::MissingField {
                row,
                field: "manufacturer",
            });
        }
        if self.registrations < 0 {
            return Err(ValidationError::NegativeRegistrations {
                row,
                value: self.registrations,
            });
        }

        let date = parse_month(&self.date).ok_or_else(|| ValidationError::MalformedDate {
            row,
            value: self.date.clone(),
        })?;
        self.check_period_columns(row, date)?;

        Ok(RegistrationRecord {
            date,
            vehicle_category: vehicle_category.to_string(),
            manufacturer: manufacturer.to_string(),
            registrations: self.registrations as u64,
        })
    }

    fn check_period_columns(&self, row: usize, date: NaiveDate) -> Result<(), ValidationError> {
        let mismatch = |field: &'static str, value: String| ValidationError::InconsistentPeriod {
            row,
            field,
            value,
            date: date.format("%Y-%m").to_string(),
        };

        if let Some(year) = self.year {
            if year != date.year() {
                return Err(mismatch("year", year.to_string()));
            }
        }
        if let Some(month) = self.month {
            if month != date.month() {
                return Err(mismatch("month", month.to_string()));
            }
        }
        if let Some(quarter) = self.quarter.as_deref() {
            let parsed = quarter.parse::<Quarter>().ok();
            if parsed != Quarter::from_month(date.month()) {
                return Err(mismatch("quarter", quarter.to_string()));
            }
        }
        Ok(())
    }
}

// ── RegistrationRecord ────────────────────────────────────────────────────────

/// A validated registration count for one (month, category, manufacturer).
///
/// `date` is always the first day of the month. Year, quarter and month are
/// derived from it on demand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RegistrationRecord {
    pub date: NaiveDate,
    pub vehicle_category: String,
    pub manufacturer: String,
    pub registrations: u64,
}

impl RegistrationRecord {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn quarter(&self) -> Quarter {
        // date.month() is always 1..=12
        Quarter::from_month(self.date.month()).unwrap_or(Quarter::Q4)
    }

    pub fn period(&self, granularity: Granularity) -> PeriodKey {
        PeriodKey::of(self.date, granularity)
    }
}

// ── Date parsing ──────────────────────────────────────────────────────────────

/// First day of the given month, if valid.
pub fn month_start(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Parse a date string and truncate it to the first day of its month.
///
/// Accepts full dates (`2023-03-31`, `2023/03/31`), date-times as written by
/// pandas (`2023-03-31 00:00:00`, `2023-03-31T00:00:00`), bare months
/// (`2023-03`) and month names (`March 2023`, `Mar 2023`).
pub fn parse_month(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];

    let parsed = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d").ok())
        .or_else(|| {
            let with_day = format!("1 {s}");
            ["%d %B %Y", "%d %b %Y"]
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(&with_day, fmt).ok())
        })?;

    month_start(parsed.year(), parsed.month())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── parse_month ───────────────────────────────────────────────────────────

    #[test]
    fn test_parse_month_formats() {
        let expected = ymd(2023, 3, 1);
        for input in [
            "2023-03-31",
            "2023/03/15",
            "2023-03-31 00:00:00",
            "2023-03-31T00:00:00",
            "2023-03",
            "March 2023",
            "Mar 2023",
            "  2023-03-01  ",
        ] {
            assert_eq!(parse_month(input), Some(expected), "input {input:?}");
        }
    }

    #[test]
    fn test_parse_month_rejects_garbage() {
        for input in ["", "2023-13", "2023-02-30", "not a date", "13/2023"] {
            assert_eq!(parse_month(input), None, "input {input:?}");
        }
    }

    // ── validate ──────────────────────────────────────────────────────────────

    #[test]
    fn test_validate_normalises_to_month_start() {
        let raw = RawRecord::new("2023-03-31", " 3W ", "Bajaj", 200);
        let record = raw.validate(0).unwrap();
        assert_eq!(record.date, ymd(2023, 3, 1));
        assert_eq!(record.vehicle_category, "3W");
        assert_eq!(record.registrations, 200);
        assert_eq!(record.year(), 2023);
        assert_eq!(record.month(), 3);
        assert_eq!(record.quarter(), Quarter::Q1);
    }

    #[test]
    fn test_validate_rejects_negative() {
        let raw = RawRecord::new("2023-03", "3W", "Bajaj", -1);
        assert_eq!(
            raw.validate(4),
            Err(ValidationError::NegativeRegistrations { row: 4, value: -1 })
        );
    }

    #[test]
    fn test_validate_rejects_malformed_date() {
        let raw = RawRecord::new("yesterday", "3W", "Bajaj", 1);
        assert!(matches!(
            raw.validate(0),
            Err(ValidationError::MalformedDate { row: 0, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_blank_manufacturer() {
        let raw = RawRecord::new("2023-03", "3W", "   ", 1);
        assert_eq!(
            raw.validate(2),
            Err(ValidationError::MissingField {
                row: 2,
                field: "manufacturer"
            })
        );
    }

    #[test]
    fn test_validate_checks_explicit_quarter() {
        let mut raw = RawRecord::new("2023-05-31", "2W", "Hero", 10);
        raw.year = Some(2023);
        raw.month = Some(5);
        raw.quarter = Some("Q2".to_string());
        assert!(raw.validate(0).is_ok());

        raw.quarter = Some("Q3".to_string());
        assert!(matches!(
            raw.validate(0),
            Err(ValidationError::InconsistentPeriod { field: "quarter", .. })
        ));
    }

    #[test]
    fn test_validate_checks_explicit_year_and_month() {
        let mut raw = RawRecord::new("2023-05", "2W", "Hero", 10);
        raw.year = Some(2022);
        assert!(matches!(
            raw.validate(0),
            Err(ValidationError::InconsistentPeriod { field: "year", .. })
        ));

        raw.year = None;
        raw.month = Some(6);
        assert!(matches!(
            raw.validate(0),
            Err(ValidationError::InconsistentPeriod { field: "month", .. })
        ));
    }

    // ── deserialisation ───────────────────────────────────────────────────────

    #[test]
    fn test_raw_record_accepts_export_column_names() {
        let json = r#"{"Date":"2021-01-31","Year":2021,"Month":1,"Quarter":"Q1",
            "Vehicle_Type":"2W","Manufacturer":"Honda","Registrations":405000,
            "Data_Source":"SIAM + Industry Reports"}"#;
        let raw: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(raw.vehicle_category, "2W");
        assert_eq!(raw.quarter.as_deref(), Some("Q1"));
        assert!(raw.validate(0).is_ok());
    }

    #[test]
    fn test_raw_record_rejects_unknown_column() {
        let json = r#"{"date":"2021-01","vehicle_category":"2W","manufacturer":"Honda",
            "registrations":1,"colour":"red"}"#;
        assert!(serde_json::from_str::<RawRecord>(json).is_err());
    }

    #[test]
    fn test_raw_record_rejects_missing_column() {
        let json = r#"{"date":"2021-01","vehicle_category":"2W","registrations":1}"#;
        assert!(serde_json::from_str::<RawRecord>(json).is_err());
    }
}
