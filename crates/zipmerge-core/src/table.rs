//! CSV table I/O.
//!
//! Readers fail fast with [`InputError::Missing`] when a required file is
//! absent and log a warning (but succeed) when it has no rows. Writers go
//! through a `.tmp` file and rename, so a crashed run never leaves a
//! half-written table behind.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::InputError;

/// Untyped table: header row plus string cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Fail with a [`InputError::Missing`] naming `table` if `path` does not exist.
pub fn require_input(table: &'static str, path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(InputError::Missing {
            table,
            path: path.to_path_buf(),
        }
        .into());
    }
    Ok(())
}

/// Read every row of a required CSV table into typed records.
pub fn read_records<T: DeserializeOwned>(table: &'static str, path: &Path) -> Result<Vec<T>> {
    require_input(table, path)?;
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {table} table: {}", path.display()))?;

    let mut rows = Vec::new();
    for (i, record) in reader.deserialize().enumerate() {
        // Line numbers are 1-based and the header takes line 1.
        let row: T = record
            .with_context(|| format!("{table} table {}: bad row at line {}", path.display(), i + 2))?;
        rows.push(row);
    }

    if rows.is_empty() {
        log::warn!("{table} table is empty: {}", path.display());
    } else {
        log::info!(
            "Loaded {} {table} rows from {}",
            crate::fmt_num(rows.len()),
            path.display()
        );
    }
    Ok(rows)
}

/// Read a required CSV table without a fixed schema.
pub fn read_raw(table: &'static str, path: &Path) -> Result<RawTable> {
    require_input(table, path)?;
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {table} table: {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read {table} header: {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.with_context(|| format!("Failed to read {table} row: {}", path.display()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    let raw = RawTable { headers, rows };
    if raw.is_empty() {
        log::warn!("{table} table is empty: {}", path.display());
    } else {
        log::info!(
            "Loaded {} {table} rows from {}",
            crate::fmt_num(raw.rows.len()),
            path.display()
        );
    }
    Ok(raw)
}

/// Write typed records as CSV (header from the first record's field names).
///
/// Returns the number of rows written.
pub fn write_records<T: Serialize>(path: &Path, rows: &[T]) -> Result<usize> {
    let tmp_path = tmp_path_for(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output dir: {}", parent.display()))?;
    }

    let file = File::create(&tmp_path)
        .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write row to {}", tmp_path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", tmp_path.display()))?;
    drop(writer);

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    Ok(rows.len())
}

/// Write an untyped table as CSV, atomically.
pub fn write_raw(path: &Path, table: &RawTable) -> Result<usize> {
    let tmp_path = tmp_path_for(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output dir: {}", parent.display()))?;
    }

    let mut writer = csv::Writer::from_path(&tmp_path)
        .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    drop(writer);

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    Ok(table.rows.len())
}

pub fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
