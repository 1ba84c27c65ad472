//! Shared types for the registration dashboard.
//!
//! Record schema and load-time validation, calendar period keys, filter
//! parameters, the error taxonomy, CLI settings and number formatting.

pub mod error;
pub mod filter;
pub mod formatting;
pub mod models;
pub mod period;
pub mod settings;

pub use error::{DashboardError, Result, ValidationError};
