//! The in-memory record store.
//!
//! A [`RecordStore`] is built once from a batch of raw rows and never changes
//! afterwards. Every query borrows it through a [`RecordView`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use regdash_core::error::{Result, ValidationError};
use regdash_core::filter::Selector;
use regdash_core::models::{RawRecord, RegistrationRecord};
use tracing::debug;

// ── RecordStore ───────────────────────────────────────────────────────────────

/// Canonical table of registration records, one per
/// (month, vehicle category, manufacturer).
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<RegistrationRecord>,
}

type RecordKey = (NaiveDate, String, String);

impl RecordStore {
    /// Validate `raw` and build a store from it.
    ///
    /// Rows sharing a (month, category, manufacturer) key are summed. The
    /// first invalid row fails the whole batch; nothing is partially loaded.
    ///
    /// The grand total of the batch must fit in a `u64`, so any sum over any
    /// subset of the store cannot overflow.
    pub fn load(raw: &[RawRecord]) -> Result<Self> {
        let mut table: BTreeMap<RecordKey, u64> = BTreeMap::new();
        let mut duplicates = 0usize;
        let mut grand_total = 0u64;

        for (row, raw_record) in raw.iter().enumerate() {
            let record = raw_record.validate(row)?;
            grand_total = grand_total
                .checked_add(record.registrations)
                .ok_or(ValidationError::Overflow { row })?;
            let key = (record.date, record.vehicle_category, record.manufacturer);

            match table.get_mut(&key) {
                Some(total) => {
                    *total = total
                        .checked_add(record.registrations)
                        .ok_or(ValidationError::Overflow { row })?;
                    duplicates += 1;
                }
                None => {
                    table.insert(key, record.registrations);
                }
            }
        }

        let records: Vec<RegistrationRecord> = table
            .into_iter()
            .map(
                |((date, vehicle_category, manufacturer), registrations)| RegistrationRecord {
                    date,
                    vehicle_category,
                    manufacturer,
                    registrations,
                },
            )
            .collect();

        debug!(
            "Loaded {} records from {} raw rows ({} duplicates coalesced)",
            records.len(),
            raw.len(),
            duplicates
        );

        Ok(Self { records })
    }

    /// Read-only view over every record.
    pub fn query(&self) -> RecordView<'_> {
        RecordView {
            rows: self.records.iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct vehicle categories, sorted.
    pub fn vehicle_categories(&self) -> Vec<&str> {
        let set: BTreeSet<&str> = self
            .records
            .iter()
            .map(|r| r.vehicle_category.as_str())
            .collect();
        set.into_iter().collect()
    }

    /// Distinct manufacturers within the selected category, sorted.
    pub fn manufacturers(&self, category: &Selector) -> Vec<&str> {
        let set: BTreeSet<&str> = self
            .records
            .iter()
            .filter(|r| category.matches(&r.vehicle_category))
            .map(|r| r.manufacturer.as_str())
            .collect();
        set.into_iter().collect()
    }

    /// Earliest and latest month present, or `None` for an empty store.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.records.iter().map(|r| r.date).min()?;
        let max = self.records.iter().map(|r| r.date).max()?;
        Some((min, max))
    }
}

// ── RecordView ────────────────────────────────────────────────────────────────

/// A borrowed subset of a [`RecordStore`].
///
/// Views never copy or modify records; filtering a view produces a new view.
#[derive(Debug, Clone, Default)]
pub struct RecordView<'a> {
    rows: Vec<&'a RegistrationRecord>,
}

impl<'a> RecordView<'a> {
    pub(crate) fn from_rows(rows: Vec<&'a RegistrationRecord>) -> Self {
        Self { rows }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a RegistrationRecord> + '_ {
        self.rows.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_registrations(&self) -> u64 {
        self.rows.iter().map(|r| r.registrations).sum()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
