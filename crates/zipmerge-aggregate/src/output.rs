//! Persisting the final dataset and the intermediate tables.
//!
//! Mapping-valued columns are JSON objects with sorted keys and floats use
//! shortest round-trip formatting, so identical inputs give identical bytes.

use std::fmt;
use std::fs::{self, File};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray, UInt64Array};
use arrow::record_batch::RecordBatch;
use arrow::datatypes::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use serde::{Serialize, Serializer};

use zipmerge_core::fmt_num;
use zipmerge_core::table::{RawTable, tmp_path_for, write_raw, write_records};

use crate::DerivedTables;
use crate::merge::{FinalRow, FinalTable};

/// Serialize a nested value as a JSON string cell.
pub(crate) fn as_json<T: Serialize, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
    let text = serde_json::to_string(value).map_err(serde::ser::Error::custom)?;
    s.serialize_str(&text)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "parquet" => Ok(Self::Parquet),
            other => Err(format!("unknown output format '{other}' (expected csv or parquet)")),
        }
    }
}

const ZIP_HEADERS: [&str; 5] = [
    "ZIP Code",
    "Store_Count",
    "Store_Chain_Distribution",
    "Avg_Latitude",
    "Avg_Longitude",
];
const GEOMETRY_HEADER: &str = "geometry";
const PRODUCT_HEADERS: [&str; 8] = [
    "Product Category",
    "Avg_Price",
    "Min_Price",
    "Max_Price",
    "Median_Price",
    "Price_Volatility",
    "Promo_Frequency",
    "Avg_Product_Count",
];
const KEYWORD_HEADER: &str = "ZIP_Keyword_Frequency";

/// Column names of the final dataset, in output order.
pub fn final_headers(table: &FinalTable) -> Vec<String> {
    let mut headers: Vec<String> = ZIP_HEADERS.iter().map(|h| h.to_string()).collect();
    headers.extend(table.demographic_columns.iter().cloned());
    if table.has_geometry {
        headers.push(GEOMETRY_HEADER.to_string());
    }
    headers.extend(PRODUCT_HEADERS.iter().map(|h| h.to_string()));
    headers.push(KEYWORD_HEADER.to_string());
    headers
}

fn row_cells(row: &FinalRow) -> Result<Vec<String>> {
    let mut cells = vec![
        row.zip_code.clone(),
        row.store_count.to_string(),
        serde_json::to_string(&row.chain_distribution)?,
        row.avg_latitude.to_string(),
        row.avg_longitude.to_string(),
    ];
    cells.extend(row.demographics.iter().map(f64::to_string));
    if let Some(geometry) = &row.geometry {
        cells.push(geometry.clone());
    }
    cells.push(row.category.clone());
    cells.extend(
        [
            row.avg_price,
            row.min_price,
            row.max_price,
            row.median_price,
            row.price_volatility,
            row.promo_frequency,
            row.avg_product_count,
        ]
        .iter()
        .map(f64::to_string),
    );
    cells.push(serde_json::to_string(&row.keyword_frequency)?);
    Ok(cells)
}

/// Final dataset as an untyped table of formatted cells.
pub fn to_raw_table(table: &FinalTable) -> Result<RawTable> {
    Ok(RawTable {
        headers: final_headers(table),
        rows: table.rows.iter().map(row_cells).collect::<Result<_>>()?,
    })
}

fn final_schema(table: &FinalTable) -> Schema {
    let mut fields = vec![
        Field::new(ZIP_HEADERS[0], DataType::Utf8, false),
        Field::new(ZIP_HEADERS[1], DataType::UInt64, false),
        Field::new(ZIP_HEADERS[2], DataType::Utf8, false),
        Field::new(ZIP_HEADERS[3], DataType::Float64, false),
        Field::new(ZIP_HEADERS[4], DataType::Float64, false),
    ];
    fields.extend(
        table
            .demographic_columns
            .iter()
            .map(|c| Field::new(c, DataType::Float64, false)),
    );
    if table.has_geometry {
        fields.push(Field::new(GEOMETRY_HEADER, DataType::Utf8, false));
    }
    fields.push(Field::new(PRODUCT_HEADERS[0], DataType::Utf8, false));
    fields.extend(
        PRODUCT_HEADERS[1..]
            .iter()
            .map(|h| Field::new(*h, DataType::Float64, false)),
    );
    fields.push(Field::new(KEYWORD_HEADER, DataType::Utf8, false));
    Schema::new(fields)
}

fn float_column(rows: &[FinalRow], f: impl Fn(&FinalRow) -> f64) -> ArrayRef {
    Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn string_column(rows: &[FinalRow], f: impl Fn(&FinalRow) -> String) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn json_column<T: Serialize>(rows: &[FinalRow], f: impl Fn(&FinalRow) -> &T) -> Result<ArrayRef> {
    let values = rows
        .iter()
        .map(|r| serde_json::to_string(f(r)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Arc::new(StringArray::from(values)))
}

/// Final dataset as a single Arrow record batch.
pub fn to_record_batch(table: &FinalTable) -> Result<RecordBatch> {
    let rows = table.rows.as_slice();

    let mut columns: Vec<ArrayRef> = vec![
        string_column(rows, |r| r.zip_code.clone()),
        Arc::new(UInt64Array::from(
            rows.iter().map(|r| r.store_count as u64).collect::<Vec<_>>(),
        )),
        json_column(rows, |r| &r.chain_distribution)?,
        float_column(rows, |r| r.avg_latitude),
        float_column(rows, |r| r.avg_longitude),
    ];
    for i in 0..table.demographic_columns.len() {
        columns.push(float_column(rows, |r| r.demographics[i]));
    }
    if table.has_geometry {
        columns.push(string_column(rows, |r| {
            r.geometry.clone().unwrap_or_default()
        }));
    }
    columns.push(string_column(rows, |r| r.category.clone()));
    columns.push(float_column(rows, |r| r.avg_price));
    columns.push(float_column(rows, |r| r.min_price));
    columns.push(float_column(rows, |r| r.max_price));
    columns.push(float_column(rows, |r| r.median_price));
    columns.push(float_column(rows, |r| r.price_volatility));
    columns.push(float_column(rows, |r| r.promo_frequency));
    columns.push(float_column(rows, |r| r.avg_product_count));
    columns.push(json_column(rows, |r| &r.keyword_frequency)?);

    RecordBatch::try_new(Arc::new(final_schema(table)), columns)
        .context("Failed to build final record batch")
}

/// Write the final dataset as zstd-compressed Parquet via tmp → rename.
pub fn write_parquet(path: &Path, table: &FinalTable, zstd_level: i32) -> Result<usize> {
    let batch = to_record_batch(table)?;
    let tmp_path = tmp_path_for(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output dir: {}", parent.display()))?;
    }

    let file = File::create(&tmp_path)
        .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
    let level = ZstdLevel::try_new(zstd_level)
        .with_context(|| format!("Invalid zstd level {zstd_level}"))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(level))
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    Ok(batch.num_rows())
}

/// Write the final dataset in the requested format. Returns rows written.
pub fn write_final(
    path: &Path,
    table: &FinalTable,
    format: OutputFormat,
    zstd_level: i32,
) -> Result<usize> {
    let rows = match format {
        OutputFormat::Csv => write_raw(path, &to_raw_table(table)?)?,
        OutputFormat::Parquet => write_parquet(path, table, zstd_level)?,
    };
    log::info!("Wrote {} final rows to {}", fmt_num(rows), path.display());
    Ok(rows)
}

pub const PRODUCT_SUMMARY_FILE: &str = "product_summary.csv";
pub const STORE_SUMMARY_FILE: &str = "store_category_summary.csv";
pub const ZIP_ROLLUP_FILE: &str = "zip_category_summary.csv";
pub const LOCATION_SUMMARY_FILE: &str = "location_summary.csv";

/// Write the intermediate tables as CSV into `dir`.
pub fn write_intermediate(dir: &Path, tables: &DerivedTables) -> Result<()> {
    let written = [
        (PRODUCT_SUMMARY_FILE, write_records(&dir.join(PRODUCT_SUMMARY_FILE), &tables.products)?),
        (STORE_SUMMARY_FILE, write_records(&dir.join(STORE_SUMMARY_FILE), &tables.stores)?),
        (ZIP_ROLLUP_FILE, write_records(&dir.join(ZIP_ROLLUP_FILE), &tables.rollups)?),
        (
            LOCATION_SUMMARY_FILE,
            write_records(&dir.join(LOCATION_SUMMARY_FILE), &tables.locations)?,
        ),
    ];
    for (name, rows) in written {
        log::debug!("Wrote {} rows to {}", fmt_num(rows), dir.join(name).display());
    }
    Ok(())
}
