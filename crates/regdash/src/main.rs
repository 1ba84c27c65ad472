mod bootstrap;
mod report;

use anyhow::{Context, Result};
use regdash_core::filter::{FilterSpec, Selector};
use regdash_core::settings::Settings;
use regdash_data::analysis::{analyze, AnalysisOptions};
use regdash_data::reader::load_raw_records;
use regdash_data::store::RecordStore;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("regdash v{} starting", env!("CARGO_PKG_VERSION"));

    let data_path = settings
        .data_path
        .clone()
        .or_else(bootstrap::discover_data_path)
        .context("No data found; pass --data-path or create ./data or ~/.regdash/data")?;
    tracing::info!("Reading registrations from {}", data_path.display());

    // Bad filter flags fail before any data is read.
    let filter = settings.filter_spec()?;

    let raw = load_raw_records(&data_path)?;
    let store = RecordStore::load(&raw)?;
    tracing::info!("Loaded {} records", store.len());
    if let Some((first, last)) = store.date_bounds() {
        tracing::info!(
            "Data covers {} to {}",
            first.format("%Y-%m"),
            last.format("%Y-%m")
        );
    }

    for message in unknown_selections(&store, &filter) {
        tracing::warn!("{}", message);
    }

    let options = AnalysisOptions {
        top_n: settings.top_n as usize,
        show_raw: settings.show_raw,
    };
    let report = analyze(&store, &filter, &options)?;

    match settings.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print!("{}", report::render_text(&report)),
    }

    Ok(())
}

/// Describe filter selections that name a value absent from the store.
fn unknown_selections(store: &RecordStore, filter: &FilterSpec) -> Vec<String> {
    let mut messages = Vec::new();

    if let Selector::Only(category) = &filter.vehicle_category {
        let known = store.vehicle_categories();
        if !known.contains(&category.as_str()) {
            messages.push(format!(
                "Vehicle category {:?} not in data; available: {}",
                category,
                known.join(", ")
            ));
        }
    }

    if let Selector::Only(manufacturer) = &filter.manufacturer {
        let known = store.manufacturers(&filter.vehicle_category);
        if !known.contains(&manufacturer.as_str()) {
            messages.push(format!(
                "Manufacturer {:?} not in data for the selected category; available: {}",
                manufacturer,
                known.join(", ")
            ));
        }
    }

    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use regdash_core::models::RawRecord;

    fn sample_store() -> RecordStore {
        let raw = vec![
            RawRecord::new("2023-01", "2W", "Hero", 10),
            RawRecord::new("2023-01", "3W", "Bajaj", 5),
        ];
        RecordStore::load(&raw).unwrap()
    }

    #[test]
    fn test_known_selections_are_silent() {
        let store = sample_store();
        let filter = FilterSpec::default()
            .with_vehicle_category("2W")
            .with_manufacturer("Hero");
        assert!(unknown_selections(&store, &filter).is_empty());
        assert!(unknown_selections(&store, &FilterSpec::default()).is_empty());
    }

    #[test]
    fn test_unknown_category_is_reported() {
        let store = sample_store();
        let filter = FilterSpec::default().with_vehicle_category("EV");
        let messages = unknown_selections(&store, &filter);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("\"EV\""));
        assert!(messages[0].contains("2W, 3W"));
    }

    #[test]
    fn test_manufacturer_outside_category_is_reported() {
        let store = sample_store();
        let filter = FilterSpec::default()
            .with_vehicle_category("3W")
            .with_manufacturer("Hero");
        let messages = unknown_selections(&store, &filter);
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("\"Hero\""));
        assert!(messages[0].ends_with("available: Bajaj"));
    }
}
