//! Dashboard analysis pipeline.
//!
//! Filters the record store once and derives every table the dashboard shows
//! from that single view, returning a [`DashboardReport`] ready for rendering.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use regdash_core::error::Result;
use regdash_core::filter::FilterSpec;
use regdash_core::period::{Granularity, PeriodKey};
use serde::Serialize;
use tracing::{debug, warn};

use crate::aggregator::{AggregatedRow, Aggregator, GroupKey};
use crate::filter::FilterEngine;
use crate::growth::{Growth, GrowthCalculator, GrowthTable};
use crate::ranking::{RankedEntity, RankingEngine};
use crate::store::RecordStore;

/// Number of manufacturers ranked when no other value is configured.
pub const DEFAULT_TOP_N: usize = 10;

// ── Public types ──────────────────────────────────────────────────────────────

/// Tunables for [`analyze`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// How many manufacturers the ranking keeps.
    pub top_n: usize,
    /// Build the per-(month, category, manufacturer) detail table.
    pub show_raw: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            show_raw: false,
        }
    }
}

/// Headline figures for the filtered view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_registrations: u64,
    /// Mean of the per-month totals, `None` when no month has data.
    pub average_monthly_registrations: Option<f64>,
    /// Distinct manufacturer names in the view.
    pub active_manufacturers: usize,
    pub latest_month: Option<PeriodKey>,
    pub latest_month_registrations: Option<u64>,
    /// Growth of the latest month over the calendar month before it.
    pub latest_month_growth: Option<Growth>,
}

/// Metadata produced alongside the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisMetadata {
    /// RFC 3339 timestamp when this report was generated.
    pub generated_at: String,
    pub filter: FilterSpec,
    pub records_in_store: usize,
    pub records_after_filter: usize,
    /// Wall-clock seconds spent in [`analyze`].
    pub elapsed_seconds: f64,
}

/// The complete output of [`analyze`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub summary: DashboardSummary,
    pub category_yoy: GrowthTable,
    pub category_qoq: GrowthTable,
    pub manufacturer_yoy: GrowthTable,
    /// Year the share and ranking sections cover.
    pub latest_year: Option<i32>,
    pub category_share: BTreeMap<String, f64>,
    pub top_manufacturers: Vec<RankedEntity>,
    /// Registrations per (month, category, manufacturer), newest month first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<Vec<AggregatedRow>>,
    pub metadata: AnalysisMetadata,
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the full dashboard pipeline over `store`.
///
/// 1. Apply `filter`.
/// 2. Compute the headline KPIs.
/// 3. YoY and QoQ growth by vehicle category, YoY by manufacturer.
/// 4. Category market share and the top manufacturers for the latest year.
/// 5. Optionally, the month-level detail table.
///
/// An empty filtered view produces a report with zero totals and empty
/// tables, never an error.
pub fn analyze(
    store: &RecordStore,
    filter: &FilterSpec,
    options: &AnalysisOptions,
) -> Result<DashboardReport> {
    let started = std::time::Instant::now();

    // ── Step 1: Filter ────────────────────────────────────────────────────────
    let view = FilterEngine::apply(store, filter);
    if view.is_empty() {
        warn!("No records match the current filters");
    }

    // ── Step 2: KPIs ──────────────────────────────────────────────────────────
    let monthly = Aggregator::aggregate_view(&view, &[GroupKey::Date]);
    let month_count = monthly.len();
    let total_registrations = view.total_registrations();
    let average_monthly_registrations =
        (month_count > 0).then(|| total_registrations as f64 / month_count as f64);

    let active_manufacturers = view
        .iter()
        .map(|r| r.manufacturer.as_str())
        .collect::<BTreeSet<_>>()
        .len();

    let mom = GrowthCalculator::month_over_month(&view, &[])?;
    let latest_month = monthly.latest_period(Granularity::Month);
    let latest_row = latest_month.and_then(|p| mom.find("All", p));

    let summary = DashboardSummary {
        total_registrations,
        average_monthly_registrations,
        active_manufacturers,
        latest_month,
        latest_month_registrations: latest_row.map(|r| r.registrations),
        latest_month_growth: latest_row.map(|r| r.growth),
    };

    // ── Step 3: Growth tables ─────────────────────────────────────────────────
    let category = [GroupKey::VehicleCategory];
    let category_yoy = GrowthCalculator::year_over_year(&view, &category)?;
    let category_qoq = GrowthCalculator::quarter_over_quarter(&view, &category)?;
    let manufacturer_yoy = GrowthCalculator::year_over_year(&view, &[GroupKey::Manufacturer])?;

    // ── Step 4: Share and ranking ─────────────────────────────────────────────
    let yearly = Aggregator::aggregate_view(
        &view,
        &[
            GroupKey::Year,
            GroupKey::VehicleCategory,
            GroupKey::Manufacturer,
        ],
    );
    let latest_year = yearly.latest_period(Granularity::Year);
    let (category_share, top_manufacturers) = match latest_year {
        Some(year) => (
            RankingEngine::market_share(&yearly, &category, year)?,
            RankingEngine::top_n(&yearly, &[GroupKey::Manufacturer], year, options.top_n)?,
        ),
        None => (BTreeMap::new(), Vec::new()),
    };

    // ── Step 5: Detail table ──────────────────────────────────────────────────
    let raw_data = options.show_raw.then(|| {
        let detail = Aggregator::aggregate_view(
            &view,
            &[
                GroupKey::Date,
                GroupKey::VehicleCategory,
                GroupKey::Manufacturer,
            ],
        );
        let mut rows = detail.rows().to_vec();
        // Stable sort keeps category and manufacturer ascending within a month.
        rows.sort_by(|a, b| b.get(GroupKey::Date).cmp(&a.get(GroupKey::Date)));
        rows
    });

    // ── Step 6: Build report ──────────────────────────────────────────────────
    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        filter: filter.clone(),
        records_in_store: store.len(),
        records_after_filter: view.len(),
        elapsed_seconds: started.elapsed().as_secs_f64(),
    };

    debug!(
        "Analysis covered {} of {} records across {} months in {:.3}s",
        metadata.records_after_filter,
        metadata.records_in_store,
        month_count,
        metadata.elapsed_seconds
    );

    Ok(DashboardReport {
        summary,
        category_yoy,
        category_qoq,
        manufacturer_yoy,
        latest_year: latest_year.map(|p| p.year()),
        category_share,
        top_manufacturers,
        raw_data,
        metadata,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::growth::UndefinedReason;
    use chrono::NaiveDate;
    use regdash_core::models::RawRecord;

    fn store(rows: &[(&str, &str, &str, i64)]) -> RecordStore {
        let raw: Vec<RawRecord> = rows
            .iter()
            .map(|(d, c, m, n)| RawRecord::new(*d, *c, *m, *n))
            .collect();
        RecordStore::load(&raw).unwrap()
    }

    fn sample_store() -> RecordStore {
        store(&[
            ("2022-01", "2W", "Hero", 100),
            ("2022-01", "3W", "Bajaj", 20),
            ("2022-02", "2W", "Honda", 60),
            ("2023-01", "2W", "Hero", 150),
            ("2023-01", "3W", "Bajaj", 30),
            ("2023-02", "2W", "Honda", 90),
            ("2023-02", "4W", "Kia", 30),
        ])
    }

    fn ymd(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    // ── analyze ───────────────────────────────────────────────────────────────

    #[test]
    fn test_summary_kpis() {
        let s = sample_store();
        let report = analyze(&s, &FilterSpec::default(), &AnalysisOptions::default()).unwrap();
        let summary = &report.summary;

        assert_eq!(summary.total_registrations, 480);
        // Four months: 2022-01, 2022-02, 2023-01, 2023-02.
        let avg = summary.average_monthly_registrations.unwrap();
        assert!((avg - 120.0).abs() < 1e-9);
        assert_eq!(summary.active_manufacturers, 4);
        assert_eq!(summary.latest_month, Some(PeriodKey::Month(2023, 2)));
        assert_eq!(summary.latest_month_registrations, Some(120));

        // 2023-01 total 180, 2023-02 total 120.
        let growth = summary.latest_month_growth.unwrap().value().unwrap();
        assert!((growth - (-100.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_latest_month_after_gap_is_undefined() {
        let s = store(&[("2023-01", "2W", "Hero", 10), ("2023-03", "2W", "Hero", 20)]);
        let report = analyze(&s, &FilterSpec::default(), &AnalysisOptions::default()).unwrap();
        assert_eq!(
            report.summary.latest_month_growth,
            Some(Growth::Undefined(UndefinedReason::MissingPriorPeriod))
        );
    }

    #[test]
    fn test_growth_tables_by_category_and_manufacturer() {
        let s = sample_store();
        let report = analyze(&s, &FilterSpec::default(), &AnalysisOptions::default()).unwrap();

        let two_wheeler = report
            .category_yoy
            .find("2W", PeriodKey::Year(2023))
            .unwrap();
        // 2022: 160, 2023: 240.
        assert!((two_wheeler.growth.value().unwrap() - 50.0).abs() < 1e-9);

        let kia = report
            .manufacturer_yoy
            .find("Kia", PeriodKey::Year(2023))
            .unwrap();
        assert_eq!(kia.growth, Growth::Undefined(UndefinedReason::FirstPeriod));

        assert!(!report.category_qoq.is_empty());
        assert_eq!(report.category_qoq.granularity, Granularity::Quarter);
    }

    #[test]
    fn test_share_and_ranking_use_latest_year() {
        let s = sample_store();
        let options = AnalysisOptions {
            top_n: 2,
            ..Default::default()
        };
        let report = analyze(&s, &FilterSpec::default(), &options).unwrap();

        assert_eq!(report.latest_year, Some(2023));
        let sum: f64 = report.category_share.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!((report.category_share["2W"] - 0.8).abs() < 1e-12);

        let names: Vec<&str> = report
            .top_manufacturers
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        // Hero 150, Honda 90, then Bajaj and Kia tie at 30.
        assert_eq!(names, vec!["Hero", "Honda"]);
    }

    #[test]
    fn test_manufacturer_filter_still_ranks() {
        let s = sample_store();
        let spec = FilterSpec::default().with_manufacturer("Honda");
        let report = analyze(&s, &spec, &AnalysisOptions::default()).unwrap();
        assert_eq!(report.top_manufacturers.len(), 1);
        assert_eq!(report.top_manufacturers[0].registrations, 90);
    }

    #[test]
    fn test_date_range_applies_to_manufacturer_tables() {
        let s = sample_store();
        let spec = FilterSpec::default().with_date_range(ymd(2023, 1), ymd(2023, 12));
        let report = analyze(&s, &spec, &AnalysisOptions::default()).unwrap();

        let hero = report
            .manufacturer_yoy
            .find("Hero", PeriodKey::Year(2023))
            .unwrap();
        assert_eq!(hero.growth, Growth::Undefined(UndefinedReason::FirstPeriod));
        assert!(report
            .manufacturer_yoy
            .find("Hero", PeriodKey::Year(2022))
            .is_none());
    }

    #[test]
    fn test_empty_filter_result() {
        let s = sample_store();
        let spec = FilterSpec::default()
            .with_vehicle_category("3W")
            .with_manufacturer("Hero");
        let report = analyze(&s, &spec, &AnalysisOptions::default()).unwrap();

        assert_eq!(report.summary.total_registrations, 0);
        assert_eq!(report.summary.average_monthly_registrations, None);
        assert_eq!(report.summary.active_manufacturers, 0);
        assert_eq!(report.summary.latest_month, None);
        assert_eq!(report.summary.latest_month_growth, None);
        assert!(report.category_yoy.is_empty());
        assert!(report.category_qoq.is_empty());
        assert!(report.manufacturer_yoy.is_empty());
        assert_eq!(report.latest_year, None);
        assert!(report.category_share.is_empty());
        assert!(report.top_manufacturers.is_empty());
        assert_eq!(report.metadata.records_after_filter, 0);
    }

    #[test]
    fn test_metadata_counts() {
        let s = sample_store();
        let spec = FilterSpec::default().with_vehicle_category("2W");
        let report = analyze(&s, &spec, &AnalysisOptions::default()).unwrap();

        assert_eq!(report.metadata.records_in_store, 7);
        assert_eq!(report.metadata.records_after_filter, 4);
        assert_eq!(report.metadata.filter, spec);
        assert!(report.metadata.elapsed_seconds >= 0.0);
        assert!(chrono::DateTime::parse_from_rfc3339(&report.metadata.generated_at).is_ok());
    }

    #[test]
    fn test_raw_data_is_opt_in() {
        let s = sample_store();
        let report = analyze(&s, &FilterSpec::default(), &AnalysisOptions::default()).unwrap();
        assert!(report.raw_data.is_none());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("raw_data").is_none());
    }

    #[test]
    fn test_raw_data_newest_month_first() {
        let s = sample_store();
        let options = AnalysisOptions {
            show_raw: true,
            ..Default::default()
        };
        let spec = FilterSpec::default().with_date_range(ymd(2023, 1), ymd(2023, 12));
        let report = analyze(&s, &spec, &options).unwrap();
        let rows = report.raw_data.unwrap();

        let labels: Vec<String> = rows
            .iter()
            .map(|r| {
                r.label(&[
                    GroupKey::Date,
                    GroupKey::VehicleCategory,
                    GroupKey::Manufacturer,
                ])
                .unwrap()
            })
            .collect();
        assert_eq!(
            labels,
            vec![
                "2023-02 / 2W / Honda",
                "2023-02 / 4W / Kia",
                "2023-01 / 2W / Hero",
                "2023-01 / 3W / Bajaj",
            ]
        );
        let total: u64 = rows.iter().map(|r| r.registrations).sum();
        assert_eq!(total, report.summary.total_registrations);
    }

    #[test]
    fn test_analyze_largest_loadable_total() {
        let s = store(&[
            ("2023-01", "2W", "Hero", i64::MAX),
            ("2023-01", "3W", "Bajaj", i64::MAX),
            ("2024-02", "4W", "Kia", 1),
        ]);
        let options = AnalysisOptions {
            show_raw: true,
            ..Default::default()
        };
        let report = analyze(&s, &FilterSpec::default(), &options).unwrap();
        assert_eq!(report.summary.total_registrations, u64::MAX);
        assert_eq!(report.raw_data.map(|rows| rows.len()), Some(3));
    }

    #[test]
    fn test_report_serializes_to_json() {
        let s = sample_store();
        let report = analyze(&s, &FilterSpec::default(), &AnalysisOptions::default()).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["summary"]["total_registrations"], 480);
        assert_eq!(json["summary"]["latest_month"], "2023-02");
        assert_eq!(json["latest_year"], 2023);
        assert!(json["category_yoy"]["rows"].is_array());
        assert_eq!(json["top_manufacturers"][0]["name"], "Hero");
    }
}
