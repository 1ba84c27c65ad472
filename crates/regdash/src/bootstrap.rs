use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure the standard `~/.regdash/` directory hierarchy exists.
///
/// Creates the following directories if absent (including any missing parents):
/// - `~/.regdash/`
/// - `~/.regdash/logs/`
pub fn ensure_directories() -> anyhow::Result<()> {
    let regdash_dir = app_dir();
    std::fs::create_dir_all(&regdash_dir)?;
    std::fs::create_dir_all(regdash_dir.join("logs"))?;
    Ok(())
}

fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".regdash")
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map Python-style level names onto `EnvFilter` directives.
fn level_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_lowercase(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Output always goes to stderr so that stdout carries only the report. When
/// `log_file` is given a second, non-ANSI layer appends to that file.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(level_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

// ── Data-path discovery ────────────────────────────────────────────────────────

/// Attempt to locate registration data when `--data-path` is not given.
///
/// Checks the following paths in order and returns the first that exists:
/// 1. `./data/` in the working directory
/// 2. `~/.regdash/data/`
pub fn discover_data_path() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    discover_data_path_from(&cwd)
}

fn discover_data_path_from(cwd: &Path) -> Option<PathBuf> {
    let mut candidates = vec![cwd.join("data")];
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".regdash").join("data"));
    }
    candidates.into_iter().find(|p| p.exists())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
