//! Top-N rankings and market-share splits for a single period.

use std::collections::BTreeMap;

use regdash_core::error::{DashboardError, Result};
use regdash_core::period::PeriodKey;
use serde::Serialize;

use crate::aggregator::{AggregatedTable, GroupKey, Groupable};

/// One entry of a ranking, `rank` starting at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntity {
    pub rank: usize,
    pub name: String,
    pub registrations: u64,
}

/// Stateless ranking and market-share computations.
pub struct RankingEngine;

impl RankingEngine {
    /// The `n` entities with the most registrations in `period`.
    ///
    /// Ordered by registrations descending; equal totals are ordered by name
    /// ascending so repeated calls always agree.
    pub fn top_n(
        table: &AggregatedTable,
        entity_keys: &[GroupKey],
        period: PeriodKey,
        n: usize,
    ) -> Result<Vec<RankedEntity>> {
        let mut totals: Vec<(String, u64)> = Self::totals_in_period(table, entity_keys, period)?
            .into_iter()
            .collect();

        totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Ok(totals
            .into_iter()
            .take(n)
            .enumerate()
            .map(|(i, (name, registrations))| RankedEntity {
                rank: i + 1,
                name,
                registrations,
            })
            .collect())
    }

    /// Each entity's proportion of all registrations in `period`.
    ///
    /// Proportions sum to 1.0. When the period has no registrations at all the
    /// result is empty instead of a division by zero.
    pub fn market_share(
        table: &AggregatedTable,
        entity_keys: &[GroupKey],
        period: PeriodKey,
    ) -> Result<BTreeMap<String, f64>> {
        let totals = Self::totals_in_period(table, entity_keys, period)?;
        let grand_total: u128 = totals.values().map(|&v| u128::from(v)).sum();
        if grand_total == 0 {
            return Ok(BTreeMap::new());
        }

        Ok(totals
            .into_iter()
            .map(|(name, v)| (name, v as f64 / grand_total as f64))
            .collect())
    }

    /// Registrations per entity label within `period`.
    fn totals_in_period(
        table: &AggregatedTable,
        entity_keys: &[GroupKey],
        period: PeriodKey,
    ) -> Result<BTreeMap<String, u64>> {
        let granularity = period.granularity();
        let mut totals: BTreeMap<String, u64> = BTreeMap::new();

        for row in table.rows() {
            let row_period = row.period(granularity).ok_or_else(|| {
                let column = GroupKey::period_columns(granularity)
                    .iter()
                    .find(|&&k| row.key_value(k).is_none())
                    .copied()
                    .unwrap_or(GroupKey::Year);
                DashboardError::MissingColumn(column.to_string())
            })?;
            if row_period != period {
                continue;
            }

            let name = if entity_keys.is_empty() {
                "All".to_string()
            } else {
                row.label(entity_keys).ok_or_else(|| {
                    let column = entity_keys
                        .iter()
                        .find(|&&k| row.key_value(k).is_none())
                        .copied()
                        .unwrap_or(GroupKey::Manufacturer);
                    DashboardError::MissingColumn(column.to_string())
                })?
            };

            *totals.entry(name).or_insert(0) += row.registrations;
        }

        Ok(totals)
    }
}
