use chrono::NaiveDate;
use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{DashboardError, Result};
use crate::filter::{DateRange, FilterSpec, Selector};
use crate::models::parse_month;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Growth and market-share analytics over vehicle registration records
#[derive(Parser, Debug, Clone)]
#[command(
    name = "regdash",
    about = "Growth and market-share analytics over vehicle registration records",
    version
)]
pub struct Settings {
    /// CSV / JSON-lines file, or a directory searched recursively
    #[arg(long)]
    pub data_path: Option<PathBuf>,

    /// First month to include (YYYY-MM or YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<String>,

    /// Last month to include (YYYY-MM or YYYY-MM-DD)
    #[arg(long)]
    pub end_date: Option<String>,

    /// Vehicle category, or "All"
    #[arg(long, default_value = "All")]
    pub vehicle_category: String,

    /// Manufacturer, or "All"
    #[arg(long, default_value = "All")]
    pub manufacturer: String,

    /// Number of manufacturers in the ranking (1-100)
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=100))]
    pub top_n: u32,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Include the per-month detail table
    #[arg(long)]
    pub show_raw: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.regdash/last_used.json`.
///
/// Filters are not persisted; every run starts unfiltered.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl LastUsedParams {
    /// Default path of the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// The config path rooted at `base_dir`.
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".regdash").join("last_used.json")
    }

    /// Load persisted params from the default path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    pub fn save(&self) -> std::result::Result<(), std::io::Error> {
        self.save_to(&Self::config_path())
    }

    /// Atomically write params to `path`, creating parent directories.
    pub fn save_to(&self, path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    pub fn clear() -> std::result::Result<(), std::io::Error> {
        Self::clear_at(&Self::config_path())
    }

    pub fn clear_at(path: &std::path::Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, fill unset values from the last run, and persist
    /// the result for the next run.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with explicit arguments and
    /// config location.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(error = %e, "failed to clear saved configuration");
            }
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over persisted values.
        if !is_arg_explicitly_set(&matches, "data_path") && settings.data_path.is_none() {
            settings.data_path = last.data_path;
        }
        if !is_arg_explicitly_set(&matches, "top_n") {
            if let Some(v) = last.top_n.filter(|n| (1..=100).contains(n)) {
                settings.top_n = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "format") {
            if let Some(v) = last.format.filter(|f| f == "text" || f == "json") {
                settings.format = v;
            }
        }

        settings = Self::apply_debug(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::warn!(error = %e, "failed to save last-used parameters");
        }

        settings
    }

    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Build the filter described by the CLI flags.
    ///
    /// A missing start or end date leaves that side of the range open.
    pub fn filter_spec(&self) -> Result<FilterSpec> {
        let start = self
            .start_date
            .as_deref()
            .map(|s| parse_flag_date("start-date", s))
            .transpose()?;
        let end = self
            .end_date
            .as_deref()
            .map(|s| parse_flag_date("end-date", s))
            .transpose()?;

        let date_range = match (start, end) {
            (None, None) => None,
            (start, end) => Some(DateRange::new(
                start.unwrap_or(NaiveDate::MIN),
                end.unwrap_or(NaiveDate::MAX),
            )),
        };

        Ok(FilterSpec {
            date_range,
            vehicle_category: Selector::parse(&self.vehicle_category),
            manufacturer: Selector::parse(&self.manufacturer),
        })
    }
}

fn parse_flag_date(flag: &str, value: &str) -> Result<NaiveDate> {
    parse_month(value)
        .ok_or_else(|| DashboardError::Config(format!("--{flag}: cannot parse {value:?} as a month")))
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            data_path: s.data_path.clone(),
            top_n: Some(s.top_n),
            format: Some(s.format.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line.
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
