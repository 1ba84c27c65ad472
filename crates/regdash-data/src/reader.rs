//! Data file discovery and decoding.
//!
//! Turns CSV and JSON-lines exports into [`RawRecord`]s for the record store.
//! Decoding is all-or-nothing: one bad line fails the whole batch.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use regdash_core::error::{DashboardError, Result, ValidationError};
use regdash_core::models::RawRecord;
use tracing::{debug, warn};

/// File extensions recognised as registration data.
const DATA_EXTENSIONS: &[&str] = &["csv", "jsonl", "json"];

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all data files under `data_path`, sorted by path.
///
/// A path naming a single file is returned as-is when its extension is
/// recognised. Directories are walked recursively.
pub fn find_data_files(data_path: &Path) -> Vec<PathBuf> {
    if !data_path.exists() {
        warn!("Data path does not exist: {}", data_path.display());
        return Vec::new();
    }

    if data_path.is_file() {
        return if has_data_extension(data_path) {
            vec![data_path.to_path_buf()]
        } else {
            Vec::new()
        };
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && has_data_extension(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Read every data file under `data_path` into one batch of raw rows.
pub fn load_raw_records(data_path: &Path) -> Result<Vec<RawRecord>> {
    if !data_path.exists() {
        return Err(DashboardError::DataPathNotFound(data_path.to_path_buf()));
    }

    let files = find_data_files(data_path);
    if files.is_empty() {
        warn!("No data files found in {}", data_path.display());
        return Err(DashboardError::NoDataFiles(data_path.to_path_buf()));
    }

    let mut records = Vec::new();
    for file in &files {
        let batch = read_file(file)?;
        debug!("Read {} rows from {}", batch.len(), file.display());
        records.extend(batch);
    }

    debug!("Read {} rows from {} files", records.len(), files.len());
    Ok(records)
}

/// Decode one file according to its extension.
pub fn read_file(path: &Path) -> Result<Vec<RawRecord>> {
    match extension(path).as_deref() {
        Some("csv") => read_csv(path),
        Some("json") => read_json(path),
        _ => read_json_lines(path),
    }
}

/// Decode a CSV file with a header row. Fields are trimmed.
pub fn read_csv(path: &Path) -> Result<Vec<RawRecord>> {
    let file = open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut records = Vec::new();
    for (index, result) in reader.deserialize::<RawRecord>().enumerate() {
        let record = result.map_err(|e| {
            // Header is line 1, so data row `index` sits on line index + 2.
            let line = e
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(index + 2);
            malformed(path, line, e.to_string())
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Decode one JSON object per line. Blank lines are skipped.
pub fn read_json_lines(path: &Path) -> Result<Vec<RawRecord>> {
    let file = open(path)?;
    let reader = std::io::BufReader::new(file);

    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| DashboardError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record = serde_json::from_str::<RawRecord>(trimmed)
            .map_err(|e| malformed(path, index + 1, e.to_string()))?;
        records.push(record);
    }
    Ok(records)
}

/// Decode a `.json` file holding either an array of records or JSON lines.
pub fn read_json(path: &Path) -> Result<Vec<RawRecord>> {
    let content = std::fs::read_to_string(path).map_err(|source| DashboardError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<RawRecord>>(&content)
            .map_err(|e| malformed(path, e.line(), e.to_string()))
    } else {
        read_json_lines(path)
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn open(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).map_err(|source| DashboardError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

fn malformed(path: &Path, line: usize, reason: String) -> DashboardError {
    ValidationError::Malformed {
        path: path.to_path_buf(),
        line,
        reason,
    }
    .into()
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn has_data_extension(path: &Path) -> bool {
    extension(path)
        .map(|ext| DATA_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
