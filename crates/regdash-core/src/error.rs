use std::path::PathBuf;
use thiserror::Error;

/// A raw registration row that cannot enter the record store.
///
/// `row` is the zero-based position of the offending row in the batch handed
/// to the store (or the 1-based line number for reader errors, see
/// [`ValidationError::Malformed`]).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A registration count below zero.
    #[error("row {row}: negative registrations ({value})")]
    NegativeRegistrations { row: usize, value: i64 },

    /// The date column could not be interpreted as a calendar month.
    #[error("row {row}: malformed date {value:?}")]
    MalformedDate { row: usize, value: String },

    /// A required text column was empty.
    #[error("row {row}: missing required field `{field}`")]
    MissingField { row: usize, field: &'static str },

    /// Explicit year / month / quarter columns disagree with the date.
    #[error("row {row}: {field} {value:?} does not match date {date}")]
    InconsistentPeriod {
        row: usize,
        field: &'static str,
        value: String,
        date: String,
    },

    /// Coalescing duplicate rows overflowed the registration counter.
    #[error("row {row}: registration total overflows for duplicate key")]
    Overflow { row: usize },

    /// A data file line could not be decoded into a raw record.
    #[error("{path}:{line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}

/// All errors produced by the registration dashboard crates.
#[derive(Error, Debug)]
pub enum DashboardError {
    /// A record batch failed validation; nothing from the batch was loaded.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The data path does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// No CSV or JSON-lines files were found under the given path.
    #[error("No data files found in {0}")]
    NoDataFiles(PathBuf),

    /// A group-by column name is not part of the record schema.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// A table lacks a column the operation needs.
    #[error("Missing column `{0}` in aggregated table")]
    MissingColumn(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the dashboard crates.
pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = DashboardError::FileRead {
            path: PathBuf::from("/data/registrations.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/data/registrations.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_validation_negative_registrations() {
        let err = DashboardError::from(ValidationError::NegativeRegistrations {
            row: 3,
            value: -12,
        });
        assert_eq!(
            err.to_string(),
            "Validation failed: row 3: negative registrations (-12)"
        );
    }

    #[test]
    fn test_validation_malformed_date() {
        let err = ValidationError::MalformedDate {
            row: 0,
            value: "13/2023".to_string(),
        };
        assert_eq!(err.to_string(), "row 0: malformed date \"13/2023\"");
    }

    #[test]
    fn test_validation_missing_field() {
        let err = ValidationError::MissingField {
            row: 7,
            field: "manufacturer",
        };
        assert_eq!(err.to_string(), "row 7: missing required field `manufacturer`");
    }

    #[test]
    fn test_validation_malformed_line() {
        let err = ValidationError::Malformed {
            path: PathBuf::from("siam.csv"),
            line: 4,
            reason: "invalid digit found in string".to_string(),
        };
        assert_eq!(err.to_string(), "siam.csv:4: invalid digit found in string");
    }

    #[test]
    fn test_error_display_data_path_not_found() {
        let err = DashboardError::DataPathNotFound(PathBuf::from("/missing/dir"));
        assert_eq!(err.to_string(), "Data path not found: /missing/dir");
    }

    #[test]
    fn test_error_display_no_data_files() {
        let err = DashboardError::NoDataFiles(PathBuf::from("/empty/dir"));
        assert_eq!(err.to_string(), "No data files found in /empty/dir");
    }

    #[test]
    fn test_error_display_unknown_column() {
        let err = DashboardError::UnknownColumn("colour".to_string());
        assert_eq!(err.to_string(), "Unknown column: colour");
    }

    #[test]
    fn test_error_display_config() {
        let err = DashboardError::Config("bad start date".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad start date");
    }
}
