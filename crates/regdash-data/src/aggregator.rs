//! Group-by aggregation of registration counts.
//!
//! Records (or already aggregated rows) are grouped by an ordered list of
//! [`GroupKey`] columns and their registrations summed. Only key combinations
//! present in the input appear in the output; nothing is zero-filled.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use regdash_core::error::{DashboardError, Result};
use regdash_core::models::RegistrationRecord;
use regdash_core::period::{Granularity, PeriodKey, Quarter};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::debug;

use crate::store::RecordView;

// ── GroupKey ──────────────────────────────────────────────────────────────────

/// A column a table can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    /// The record's month (first day of the month).
    Date,
    Year,
    Quarter,
    Month,
    VehicleCategory,
    Manufacturer,
}

impl GroupKey {
    pub fn column_name(self) -> &'static str {
        match self {
            GroupKey::Date => "date",
            GroupKey::Year => "year",
            GroupKey::Quarter => "quarter",
            GroupKey::Month => "month",
            GroupKey::VehicleCategory => "vehicle_category",
            GroupKey::Manufacturer => "manufacturer",
        }
    }

    /// Parse an ordered list of column names.
    pub fn parse_columns(names: &[&str]) -> Result<Vec<GroupKey>> {
        names.iter().map(|n| n.parse()).collect()
    }

    /// The period columns needed to place a row at `granularity`.
    pub fn period_columns(granularity: Granularity) -> &'static [GroupKey] {
        match granularity {
            Granularity::Year => &[GroupKey::Year],
            Granularity::Quarter => &[GroupKey::Year, GroupKey::Quarter],
            Granularity::Month => &[GroupKey::Year, GroupKey::Month],
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for GroupKey {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(GroupKey::Date),
            "year" => Ok(GroupKey::Year),
            "quarter" => Ok(GroupKey::Quarter),
            "month" => Ok(GroupKey::Month),
            "vehicle_category" | "vehicle_type" => Ok(GroupKey::VehicleCategory),
            "manufacturer" => Ok(GroupKey::Manufacturer),
            _ => Err(DashboardError::UnknownColumn(s.to_string())),
        }
    }
}

// ── KeyValue ──────────────────────────────────────────────────────────────────

/// The value of one group-key column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyValue {
    Date(NaiveDate),
    Year(i32),
    Quarter(Quarter),
    Month(u32),
    Text(String),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Date(d) => write!(f, "{}", d.format("%Y-%m")),
            KeyValue::Year(y) => write!(f, "{y}"),
            KeyValue::Quarter(q) => write!(f, "{q}"),
            KeyValue::Month(m) => write!(f, "{m:02}"),
            KeyValue::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for KeyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            KeyValue::Year(y) => serializer.serialize_i32(*y),
            KeyValue::Month(m) => serializer.serialize_u32(*m),
            other => serializer.collect_str(other),
        }
    }
}

// ── Groupable ─────────────────────────────────────────────────────────────────

/// Anything carrying group-key columns and a registration count.
pub trait Groupable {
    /// Value of `key`, or `None` when the row does not carry that column.
    fn key_value(&self, key: GroupKey) -> Option<KeyValue>;
    /// Registrations represented by this row.
    fn registrations(&self) -> u64;
}

fn record_value(record: &RegistrationRecord, key: GroupKey) -> KeyValue {
    match key {
        GroupKey::Date => KeyValue::Date(record.date),
        GroupKey::Year => KeyValue::Year(record.year()),
        GroupKey::Quarter => KeyValue::Quarter(record.quarter()),
        GroupKey::Month => KeyValue::Month(record.month()),
        GroupKey::VehicleCategory => KeyValue::Text(record.vehicle_category.clone()),
        GroupKey::Manufacturer => KeyValue::Text(record.manufacturer.clone()),
    }
}

impl Groupable for RegistrationRecord {
    fn key_value(&self, key: GroupKey) -> Option<KeyValue> {
        Some(record_value(self, key))
    }

    fn registrations(&self) -> u64 {
        self.registrations
    }
}

// ── AggregatedRow ─────────────────────────────────────────────────────────────

/// Group-key values plus the summed registrations for that group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedRow {
    pub group: Vec<(GroupKey, KeyValue)>,
    pub registrations: u64,
}

impl AggregatedRow {
    /// The stored value for `key`, without derivation.
    pub fn get(&self, key: GroupKey) -> Option<&KeyValue> {
        self.group.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    fn date(&self) -> Option<NaiveDate> {
        match self.get(GroupKey::Date) {
            Some(KeyValue::Date(d)) => Some(*d),
            _ => None,
        }
    }

    /// The period this row belongs to, from its period columns or its date.
    pub fn period(&self, granularity: Granularity) -> Option<PeriodKey> {
        if let Some(date) = self.date() {
            return Some(PeriodKey::of(date, granularity));
        }
        let year = match self.get(GroupKey::Year)? {
            KeyValue::Year(y) => *y,
            _ => return None,
        };
        match granularity {
            Granularity::Year => Some(PeriodKey::Year(year)),
            Granularity::Quarter => match self.get(GroupKey::Quarter)? {
                KeyValue::Quarter(q) => Some(PeriodKey::Quarter(year, *q)),
                _ => None,
            },
            Granularity::Month => match self.get(GroupKey::Month)? {
                KeyValue::Month(m) => Some(PeriodKey::Month(year, *m)),
                _ => None,
            },
        }
    }

    /// Display label built from the given key columns, joined with `" / "`.
    pub fn label(&self, keys: &[GroupKey]) -> Option<String> {
        let parts: Option<Vec<String>> = keys
            .iter()
            .map(|&k| self.key_value(k).map(|v| v.to_string()))
            .collect();
        parts.map(|p| p.join(" / "))
    }
}

impl Groupable for AggregatedRow {
    fn key_value(&self, key: GroupKey) -> Option<KeyValue> {
        if let Some(value) = self.get(key) {
            return Some(value.clone());
        }
        let date = self.date()?;
        match key {
            GroupKey::Year => Some(KeyValue::Year(date.year())),
            GroupKey::Quarter => Quarter::from_month(date.month()).map(KeyValue::Quarter),
            GroupKey::Month => Some(KeyValue::Month(date.month())),
            _ => None,
        }
    }

    fn registrations(&self) -> u64 {
        self.registrations
    }
}

impl Serialize for AggregatedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.group.len() + 1))?;
        for (key, value) in &self.group {
            map.serialize_entry(key.column_name(), value)?;
        }
        map.serialize_entry("registrations", &self.registrations)?;
        map.end()
    }
}

// ── AggregatedTable ───────────────────────────────────────────────────────────

/// Output of the [`Aggregator`]: one row per distinct key combination.
///
/// Row order is not part of the contract; sort explicitly where it matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedTable {
    keys: Vec<GroupKey>,
    rows: Vec<AggregatedRow>,
}

impl AggregatedTable {
    pub fn keys(&self) -> &[GroupKey] {
        &self.keys
    }

    pub fn rows(&self) -> &[AggregatedRow] {
        &self.rows
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

    /// Re-aggregate this table by `keys`.
    ///
    /// Fails with [`DashboardError::MissingColumn`] when a key is neither a
    /// column of this table nor derivable from its `date` column.
    pub fn regroup(&self, keys: &[GroupKey]) -> Result<AggregatedTable> {
        Aggregator::aggregate(&self.rows, keys)
    }

    /// Distinct periods present at `granularity`, ascending.
    pub fn periods(&self, granularity: Granularity) -> BTreeSet<PeriodKey> {
        self.rows
            .iter()
            .filter_map(|r| r.period(granularity))
            .collect()
    }

    pub fn latest_period(&self, granularity: Granularity) -> Option<PeriodKey> {
        self.periods(granularity).into_iter().next_back()
    }
}

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Stateless group-by-and-sum helper.
pub struct Aggregator;

impl Aggregator {
    /// Group the records of `view` by `keys` and sum their registrations.
    pub fn aggregate_view(view: &RecordView<'_>, keys: &[GroupKey]) -> AggregatedTable {
        let keys = dedup_keys(keys);
        let grouped: Vec<(Vec<KeyValue>, u64)> = view
            .iter()
            .map(|record| {
                let values = keys.iter().map(|&k| record_value(record, k)).collect();
                (values, record.registrations)
            })
            .collect();
        Self::build(keys, grouped)
    }

    /// Like [`Aggregator::aggregate_view`] with columns given by name.
    pub fn aggregate_by_columns(view: &RecordView<'_>, columns: &[&str]) -> Result<AggregatedTable> {
        let keys = GroupKey::parse_columns(columns)?;
        Ok(Self::aggregate_view(view, &keys))
    }

    /// Group any [`Groupable`] rows by `keys`.
    pub fn aggregate<'a, T, I>(rows: I, keys: &[GroupKey]) -> Result<AggregatedTable>
    where
        T: Groupable + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let keys = dedup_keys(keys);
        let mut grouped = Vec::new();
        for row in rows {
            let values = keys
                .iter()
                .map(|&k| {
                    row.key_value(k)
                        .ok_or_else(|| DashboardError::MissingColumn(k.to_string()))
                })
                .collect::<Result<Vec<_>>>()?;
            grouped.push((values, row.registrations()));
        }
        Ok(Self::build(keys, grouped))
    }

    fn build(
        keys: Vec<GroupKey>,
        grouped: impl IntoIterator<Item = (Vec<KeyValue>, u64)>,
    ) -> AggregatedTable {
        let mut sums: BTreeMap<Vec<KeyValue>, u64> = BTreeMap::new();
        for (values, registrations) in grouped {
            *sums.entry(values).or_insert(0) += registrations;
        }

        let rows: Vec<AggregatedRow> = sums
            .into_iter()
            .map(|(values, registrations)| AggregatedRow {
                group: keys.iter().copied().zip(values).collect(),
                registrations,
            })
            .collect();

        debug!("Aggregated into {} groups by {:?}", rows.len(), keys);

        AggregatedTable { keys, rows }
    }
}

/// Drop repeated keys, keeping first occurrences in order.
fn dedup_keys(keys: &[GroupKey]) -> Vec<GroupKey> {
    let mut seen = BTreeSet::new();
    keys.iter().copied().filter(|k| seen.insert(*k)).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
