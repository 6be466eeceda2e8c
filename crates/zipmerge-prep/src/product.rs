//! Product cleaning: raw catalog export → Product Observation table

use std::path::Path;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;

use zipmerge_core::model::{UNKNOWN_QUANTITY, UNKNOWN_UOM, parse_number};
use zipmerge_core::{ProductObservation, fmt_num, read_records, write_records};

use crate::category::Classifier;

static QUANTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d.]+").expect("valid quantity regex"));
static UOM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z]+.*$").expect("valid uom regex"));

/// Row of the raw product export. Every cell is read as text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawProduct {
    #[serde(rename = "Product ID")]
    pub product_id: String,
    #[serde(rename = "Location ID")]
    pub location_id: String,
    #[serde(rename = "Date Retrieved")]
    pub date_retrieved: String,
    #[serde(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Size")]
    pub size: String,
    #[serde(rename = "Regular Price")]
    pub regular_price: String,
    #[serde(rename = "Promo Price")]
    pub promo_price: String,
    #[serde(rename = "Stock Level")]
    pub stock_level: String,
}

/// Row counts at each cleaning step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductCleanSummary {
    pub raw_rows: usize,
    pub inactive_dropped: usize,
    pub duplicates_dropped: usize,
    pub cleaned_rows: usize,
    /// Distinct (Location ID, Product ID) pairs after cleaning.
    pub product_locations: usize,
}

/// Left-pad a store identifier with zeros to `width` digits.
pub fn pad_location_id(raw: &str, width: usize) -> String {
    format!("{:0>width$}", raw.trim())
}

/// Split a free-text size ("12 ct", "20 oz Loaf") into quantity and unit.
///
/// No number gives [`UNKNOWN_QUANTITY`]; no letters give [`UNKNOWN_UOM`].
pub fn parse_size(size: &str) -> (f64, String) {
    let quantity = QUANTITY_RE
        .find(size)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(UNKNOWN_QUANTITY);
    let uom = UOM_RE
        .find(size)
        .map(|m| m.as_str().trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| UNKNOWN_UOM.to_string());
    (quantity, uom)
}

fn is_inactive(row: &ProductObservation) -> bool {
    row.stock_level.trim().eq_ignore_ascii_case("unknown")
        && row.regular_price == 0.0
        && row.promo_price == 0.0
}

/// Clean raw product rows.
///
/// Pads store ids, classifies, parses sizes, coerces prices (invalid → 0),
/// drops inactive listings, then keeps the first row per
/// (Product ID, Location ID, Date Retrieved).
pub fn clean_product_rows(
    raw: Vec<RawProduct>,
    classifier: &Classifier,
    id_width: usize,
) -> (Vec<ProductObservation>, ProductCleanSummary) {
    let mut summary = ProductCleanSummary {
        raw_rows: raw.len(),
        ..Default::default()
    };

    let mut seen: FxHashSet<(String, String, String)> = FxHashSet::default();
    let mut cleaned = Vec::with_capacity(raw.len());

    for r in raw {
        let (quantity, uom) = parse_size(&r.size);
        let row = ProductObservation {
            category: classifier.classify(&r.description).to_string(),
            product_id: r.product_id.trim().to_string(),
            location_id: pad_location_id(&r.location_id, id_width),
            date_retrieved: r.date_retrieved.trim().to_string(),
            brand: r.brand,
            description: r.description,
            quantity,
            uom,
            regular_price: parse_number(&r.regular_price).unwrap_or(0.0),
            promo_price: parse_number(&r.promo_price).unwrap_or(0.0),
            stock_level: r.stock_level,
        };

        if is_inactive(&row) {
            summary.inactive_dropped += 1;
            continue;
        }
        let key = (
            row.product_id.clone(),
            row.location_id.clone(),
            row.date_retrieved.clone(),
        );
        if !seen.insert(key) {
            summary.duplicates_dropped += 1;
            continue;
        }
        cleaned.push(row);
    }

    summary.cleaned_rows = cleaned.len();
    summary.product_locations = log_repeat_summary(&cleaned);
    (cleaned, summary)
}

/// Log how often each product repeats per store; returns the pair count.
fn log_repeat_summary(rows: &[ProductObservation]) -> usize {
    let mut counts: FxHashMap<(&str, &str), usize> = FxHashMap::default();
    for row in rows {
        *counts
            .entry((row.location_id.as_str(), row.product_id.as_str()))
            .or_default() += 1;
    }
    if counts.is_empty() {
        return 0;
    }
    let total: usize = counts.values().sum();
    let min = counts.values().copied().min().unwrap_or(0);
    let max = counts.values().copied().max().unwrap_or(0);
    log::debug!(
        "Observations per product-location: mean {:.2}, min {min}, max {max}",
        total as f64 / counts.len() as f64
    );
    counts.len()
}

/// Clean the raw product file and write the Product Observation table.
///
/// Returns `None` (and writes nothing) when the raw table has no rows.
pub fn clean_products(
    raw_path: &Path,
    out_path: &Path,
    classifier: &Classifier,
    id_width: usize,
) -> Result<Option<ProductCleanSummary>> {
    let raw: Vec<RawProduct> = read_records("raw product", raw_path)?;
    if raw.is_empty() {
        log::warn!("Product data is empty, skipping product cleaning");
        return Ok(None);
    }

    let (cleaned, summary) = clean_product_rows(raw, classifier, id_width);
    log::info!(
        "Products: {} raw, {} inactive, {} duplicate, {} kept ({} product-locations)",
        fmt_num(summary.raw_rows),
        fmt_num(summary.inactive_dropped),
        fmt_num(summary.duplicates_dropped),
        fmt_num(summary.cleaned_rows),
        fmt_num(summary.product_locations),
    );

    write_records(out_path, &cleaned)?;
    log::info!("Cleaned product data saved to {}", out_path.display());
    Ok(Some(summary))
}
