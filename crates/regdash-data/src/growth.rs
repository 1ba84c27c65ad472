//! Period-over-period growth within entity partitions.
//!
//! Rows are partitioned by entity (vehicle category, manufacturer, any key
//! combination, or nothing for the whole market), ordered by period, and each
//! row compared with the one before it. Growth that cannot be computed is an
//! explicit [`Growth::Undefined`], never NaN or infinity.

use std::collections::BTreeMap;
use std::fmt;

use regdash_core::error::{DashboardError, Result};
use regdash_core::formatting::format_growth;
use regdash_core::period::{Granularity, PeriodKey};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::debug;

use crate::aggregator::{AggregatedTable, Aggregator, GroupKey, Groupable, KeyValue};
use crate::store::RecordView;

// ── Growth ────────────────────────────────────────────────────────────────────

/// Why a growth figure could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// First period of its partition; nothing to compare against.
    FirstPeriod,
    /// The previous period had zero registrations.
    ZeroBaseline,
    /// The immediately preceding calendar period is absent from the data.
    MissingPriorPeriod,
}

/// A percentage change, or the reason there is none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Growth {
    Defined(f64),
    Undefined(UndefinedReason),
}

impl Growth {
    /// `(current - previous) / previous * 100`, undefined for a zero baseline.
    pub fn percent_change(previous: u64, current: u64) -> Growth {
        if previous == 0 {
            return Growth::Undefined(UndefinedReason::ZeroBaseline);
        }
        let previous = previous as f64;
        Growth::Defined((current as f64 - previous) / previous * 100.0)
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Growth::Defined(v) => Some(*v),
            Growth::Undefined(_) => None,
        }
    }
}

impl fmt::Display for Growth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_growth(self.value(), 1))
    }
}

/// Which earlier period a row is compared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// The nearest earlier period present in the data, even across gaps.
    NearestPrior,
    /// Strictly the immediately preceding calendar period.
    ImmediatePrior,
}

// ── GrowthRow / GrowthTable ───────────────────────────────────────────────────

/// One (entity, period) total and its growth over the compared period.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthRow {
    pub entity: Vec<(GroupKey, KeyValue)>,
    pub period: PeriodKey,
    pub registrations: u64,
    pub growth: Growth,
}

impl GrowthRow {
    /// Entity values joined with `" / "`, or `"All"` for the whole market.
    pub fn entity_label(&self) -> String {
        if self.entity.is_empty() {
            return "All".to_string();
        }
        self.entity
            .iter()
            .map(|(_, v)| v.to_string())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

impl Serialize for GrowthRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entity.len() + 3))?;
        for (key, value) in &self.entity {
            map.serialize_entry(key.column_name(), value)?;
        }
        map.serialize_entry("period", &self.period)?;
        map.serialize_entry("registrations", &self.registrations)?;
        map.serialize_entry("growth", &self.growth)?;
        map.end()
    }
}

/// Growth rows ordered by entity, then chronologically.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthTable {
    pub entity_keys: Vec<GroupKey>,
    pub granularity: Granularity,
    pub comparison: Comparison,
    pub rows: Vec<GrowthRow>,
}

impl GrowthTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// The row for the entity labelled `entity_label` in `period`.
    pub fn find(&self, entity_label: &str, period: PeriodKey) -> Option<&GrowthRow> {
        self.rows
            .iter()
            .find(|r| r.period == period && r.entity_label() == entity_label)
    }
}

// ── GrowthCalculator ──────────────────────────────────────────────────────────

/// Stateless growth computations.
pub struct GrowthCalculator;

impl GrowthCalculator {
    /// Compute growth over an aggregated table.
    ///
    /// The table must carry every `entity_keys` column and enough period
    /// columns (or a `date` column) to place each row at `granularity`.
    /// Rows sharing an (entity, period) pair are summed first.
    pub fn growth(
        table: &AggregatedTable,
        entity_keys: &[GroupKey],
        granularity: Granularity,
        comparison: Comparison,
    ) -> Result<GrowthTable> {
        let mut partitions: BTreeMap<Vec<KeyValue>, BTreeMap<PeriodKey, u64>> = BTreeMap::new();

        for row in table.rows() {
            let entity = entity_keys
                .iter()
                .map(|&k| {
                    row.key_value(k)
                        .ok_or_else(|| DashboardError::MissingColumn(k.to_string()))
                })
                .collect::<Result<Vec<_>>>()?;
            let period = row.period(granularity).ok_or_else(|| {
                let column = GroupKey::period_columns(granularity)
                    .iter()
                    .find(|&&k| row.key_value(k).is_none())
                    .copied()
                    .unwrap_or(GroupKey::Year);
                DashboardError::MissingColumn(column.to_string())
            })?;

            *partitions
                .entry(entity)
                .or_default()
                .entry(period)
                .or_insert(0) += row.registrations;
        }

        let mut rows = Vec::new();
        for (entity, series) in partitions {
            let mut previous: Option<(PeriodKey, u64)> = None;
            for (period, registrations) in series {
                let growth = match previous {
                    None => Growth::Undefined(UndefinedReason::FirstPeriod),
                    Some((prev_period, _))
                        if comparison == Comparison::ImmediatePrior
                            && prev_period != period.previous() =>
                    {
                        Growth::Undefined(UndefinedReason::MissingPriorPeriod)
                    }
                    Some((_, prev_registrations)) => {
                        Growth::percent_change(prev_registrations, registrations)
                    }
                };

                rows.push(GrowthRow {
                    entity: entity_keys.iter().copied().zip(entity.iter().cloned()).collect(),
                    period,
                    registrations,
                    growth,
                });
                previous = Some((period, registrations));
            }
        }

        debug!(
            "Computed {} {} growth rows by {:?}",
            rows.len(),
            granularity,
            entity_keys
        );

        Ok(GrowthTable {
            entity_keys: entity_keys.to_vec(),
            granularity,
            comparison,
            rows,
        })
    }

    /// Year-over-year growth per entity, spanning gaps.
    pub fn year_over_year(view: &RecordView<'_>, entity_keys: &[GroupKey]) -> Result<GrowthTable> {
        Self::over_view(view, entity_keys, Granularity::Year, Comparison::NearestPrior)
    }

    /// Quarter-over-quarter growth per entity, spanning gaps.
    pub fn quarter_over_quarter(
        view: &RecordView<'_>,
        entity_keys: &[GroupKey],
    ) -> Result<GrowthTable> {
        Self::over_view(view, entity_keys, Granularity::Quarter, Comparison::NearestPrior)
    }

    /// Month-over-month growth per entity against the exact prior month.
    pub fn month_over_month(
        view: &RecordView<'_>,
        entity_keys: &[GroupKey],
    ) -> Result<GrowthTable> {
        Self::over_view(view, entity_keys, Granularity::Month, Comparison::ImmediatePrior)
    }

    fn over_view(
        view: &RecordView<'_>,
        entity_keys: &[GroupKey],
        granularity: Granularity,
        comparison: Comparison,
    ) -> Result<GrowthTable> {
        let mut keys = GroupKey::period_columns(granularity).to_vec();
        keys.extend_from_slice(entity_keys);
        let table = Aggregator::aggregate_view(view, &keys);
        Self::growth(&table, entity_keys, granularity, comparison)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
