//! Data layer for the registration dashboard.
//!
//! Reads CSV and JSON-lines exports, validates them into an immutable
//! [`store::RecordStore`], and runs the filter, aggregation, growth and
//! ranking engines that back the dashboard report.

pub mod aggregator;
pub mod analysis;
pub mod filter;
pub mod growth;
pub mod ranking;
pub mod reader;
pub mod store;

pub use regdash_core as core;
