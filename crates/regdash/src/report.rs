//! Plain-text rendering of a [`DashboardReport`].

use chrono::{Datelike, NaiveDate};
use regdash_core::filter::{FilterSpec, Selector};
use regdash_core::formatting::{format_count, format_growth, format_number, format_share};
use regdash_data::aggregator::{AggregatedRow, GroupKey};
use regdash_data::analysis::DashboardReport;
use regdash_data::growth::GrowthTable;

const INDENT: &str = "  ";

/// Render the whole report as a human-readable block of text.
pub fn render_text(report: &DashboardReport) -> String {
    let mut lines = vec![
        "Vehicle Registration Dashboard".to_string(),
        "==============================".to_string(),
        format!("Filter: {}", describe_filter(&report.metadata.filter)),
        format!(
            "Records: {} of {}",
            format_count(report.metadata.records_after_filter as u64),
            format_count(report.metadata.records_in_store as u64)
        ),
        String::new(),
    ];

    lines.extend(render_summary(report));

    lines.push(String::new());
    lines.push("YoY growth by vehicle category".to_string());
    lines.extend(render_growth(&report.category_yoy, "Category"));

    lines.push(String::new());
    lines.push("QoQ growth by vehicle category".to_string());
    lines.extend(render_growth(&report.category_qoq, "Category"));

    lines.push(String::new());
    lines.push("YoY growth by manufacturer".to_string());
    lines.extend(render_growth(&report.manufacturer_yoy, "Manufacturer"));

    let year = report
        .latest_year
        .map(|y| format!(" ({y})"))
        .unwrap_or_default();

    lines.push(String::new());
    lines.push(format!("Market share by vehicle category{year}"));
    let share_rows: Vec<Vec<String>> = report
        .category_share
        .iter()
        .map(|(category, share)| vec![category.clone(), format_share(*share, 1)])
        .collect();
    lines.extend(render_table(&["Category", "Share"], share_rows, 1));

    lines.push(String::new());
    lines.push(format!(
        "Top {} manufacturers{year}",
        report.top_manufacturers.len()
    ));
    let top_rows: Vec<Vec<String>> = report
        .top_manufacturers
        .iter()
        .map(|r| {
            vec![
                r.rank.to_string(),
                r.name.clone(),
                format_count(r.registrations),
            ]
        })
        .collect();
    lines.extend(render_table(&["#", "Manufacturer", "Registrations"], top_rows, 2));

    if let Some(raw) = &report.raw_data {
        lines.push(String::new());
        lines.push("Raw data".to_string());
        lines.extend(render_raw(raw));
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

// ── Sections ──────────────────────────────────────────────────────────────────

fn render_summary(report: &DashboardReport) -> Vec<String> {
    let summary = &report.summary;
    let average = summary
        .average_monthly_registrations
        .map(|v| format_number(v, 1))
        .unwrap_or_else(|| "N/A".to_string());
    let latest = match (summary.latest_month, summary.latest_month_registrations) {
        (Some(month), Some(registrations)) => format!(
            "{} ({}, {} MoM)",
            month,
            format_count(registrations),
            format_growth(summary.latest_month_growth.and_then(|g| g.value()), 1)
        ),
        _ => "N/A".to_string(),
    };

    let rows = vec![
        vec![
            "Total registrations".to_string(),
            format_count(summary.total_registrations),
        ],
        vec!["Avg monthly registrations".to_string(), average],
        vec![
            "Active manufacturers".to_string(),
            summary.active_manufacturers.to_string(),
        ],
        vec!["Latest month".to_string(), latest],
    ];

    let mut lines = vec!["Key metrics".to_string()];
    lines.extend(align(&rows, usize::MAX));
    lines
}

fn render_growth(table: &GrowthTable, entity_header: &str) -> Vec<String> {
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|r| {
            vec![
                r.entity_label(),
                r.period.to_string(),
                format_count(r.registrations),
                r.growth.to_string(),
            ]
        })
        .collect();
    render_table(&[entity_header, "Period", "Registrations", "Growth"], rows, 2)
}

fn render_raw(rows: &[AggregatedRow]) -> Vec<String> {
    let cell = |row: &AggregatedRow, key: GroupKey| {
        row.get(key).map(|v| v.to_string()).unwrap_or_default()
    };
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                cell(r, GroupKey::Date),
                cell(r, GroupKey::VehicleCategory),
                cell(r, GroupKey::Manufacturer),
                format_count(r.registrations),
            ]
        })
        .collect();
    render_table(&["Month", "Category", "Manufacturer", "Registrations"], rows, 3)
}

// ── Table layout ──────────────────────────────────────────────────────────────

/// Header plus rows, with columns from `numeric_from` onwards right-aligned.
fn render_table(headers: &[&str], rows: Vec<Vec<String>>, numeric_from: usize) -> Vec<String> {
    if rows.is_empty() {
        return vec![format!("{INDENT}No data")];
    }
    let mut all = Vec::with_capacity(rows.len() + 1);
    all.push(headers.iter().map(|h| h.to_string()).collect());
    all.extend(rows);
    align(&all, numeric_from)
}

fn align(rows: &[Vec<String>], numeric_from: usize) -> Vec<String> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|c| {
            rows.iter()
                .filter_map(|r| r.get(c))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    rows.iter()
        .map(|row| {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(c, cell)| {
                    if c >= numeric_from {
                        format!("{:>width$}", cell, width = widths[c])
                    } else {
                        format!("{:<width$}", cell, width = widths[c])
                    }
                })
                .collect();
            format!("{INDENT}{}", cells.join("  ").trim_end())
        })
        .collect()
}

// ── Filter description ────────────────────────────────────────────────────────

fn describe_filter(filter: &FilterSpec) -> String {
    let dates = match filter.date_range {
        Some(range) => format!("{} to {}", describe_bound(range.start), describe_bound(range.end)),
        None => "all".to_string(),
    };
    format!(
        "category={}, manufacturer={}, dates={}",
        describe_selector(&filter.vehicle_category),
        describe_selector(&filter.manufacturer),
        dates
    )
}

fn describe_selector(selector: &Selector) -> &str {
    match selector {
        Selector::All => "All",
        Selector::Only(value) => value.as_str(),
    }
}

fn describe_bound(date: NaiveDate) -> String {
    if (1..=9999).contains(&date.year()) {
        date.format("%Y-%m").to_string()
    } else {
        "open".to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
